// SPDX-License-Identifier: MIT

//! drainer: long-running service that evacuates shards off nodes slated
//! for termination and postpones the cloud provider's termination action
//! until the node is safe to lose (§1).

use clap::Parser;
use drainer::{coordinator, health, DrainCoordinator, DrainerConfig, EventSource, Tracker};
use escp_cloud::AwsCloudApi;
use escp_cluster::HttpClusterApi;
use escp_common::{logging, metrics_server, shutdown, Health};
use escp_core::{EventBus, HookCache, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DrainerConfig::parse();
    config.validate()?;

    logging::init(&config.log_level);
    tracing::info!(queue = %config.queue, interval_secs = config.interval_secs, "starting drainer");

    let supervisor = shutdown::Supervisor::new();
    let health = Health::new();
    let bus = EventBus::new();

    let http_client = reqwest::Client::new();
    let cluster = Arc::new(HttpClusterApi::new(http_client.clone(), config.elasticsearch_url.clone()));
    let cloud = Arc::new(AwsCloudApi::from_env().await);
    let clock = SystemClock;
    let hook_cache = Arc::new(HookCache::new(clock.clone(), Duration::from_secs(config.hook_cache_ttl_secs), config.hook_cache_capacity));

    health::check_local_node(&http_client, &config.local_node_url, &config.local_node_name, cluster.as_ref()).await?;
    health.set_ready(true);

    let serve_handle = {
        let addr = config.serve_addr.clone();
        let health = health.clone();
        tokio::spawn(async move { metrics_server::serve(&addr, health).await })
    };

    let tracker = Arc::new(Tracker::new(cluster.clone(), bus.clone()));
    let tracker_handle = {
        let tracker = tracker.clone();
        let token = supervisor.token();
        let interval = Duration::from_secs(config.interval_secs);
        tokio::spawn(async move { run_tracker_loop(tracker, interval, token).await })
    };

    let coordinator = Arc::new(DrainCoordinator::new(cluster.clone(), cloud.clone(), clock, bus.clone(), hook_cache));
    let coordinator_handle = {
        let bus = bus.clone();
        let token = supervisor.token();
        let batch_max = config.spot_batch_max;
        let batch_window = Duration::from_millis(config.spot_batch_window_ms);
        tokio::spawn(async move { coordinator::run_with_batch_params(coordinator, bus, token, batch_max, batch_window).await })
    };

    let event_source = EventSource::new(cloud.clone(), bus.clone(), config.queue.clone());
    let event_source_handle = {
        let token = supervisor.token();
        tokio::spawn(async move {
            if let Err(err) = event_source.run(token).await {
                tracing::error!(%err, "event source aborted");
            }
        })
    };

    supervisor.wait().await;
    supervisor.cancel();

    let _ = tokio::join!(tracker_handle, coordinator_handle, event_source_handle);
    serve_handle.abort();

    tracing::info!("drainer shut down");
    Ok(())
}

async fn run_tracker_loop<C: escp_cluster::ClusterApi + 'static>(tracker: Arc<Tracker<C>>, interval: Duration, cancel: CancellationToken) {
    if let Err(err) = tracker.tick().await {
        tracing::error!(%err, "initial cluster-state tick failed");
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(err) = tracker.tick().await {
                    tracing::error!(%err, "cluster-state tick failed");
                }
            }
        }
    }
}
