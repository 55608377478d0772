// SPDX-License-Identifier: MIT

//! throttler: suspends a cluster's autoscaling groups' alarm-notification
//! process while the cluster is unhealthy, and resumes it once the
//! cluster has recovered (§1, §4.5).

use clap::Parser;
use escp_cloud::AwsCloudApi;
use escp_cluster::HttpClusterApi;
use escp_common::{logging, metrics_server, shutdown, Health};
use std::sync::Arc;
use std::time::Duration;
use throttler::{ClusterStateGate, ThrottlerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ThrottlerConfig::parse();
    config.validate()?;

    logging::init(&config.log_level);
    tracing::info!(groups = ?config.groups, interval_secs = config.interval_secs, dry_run = config.dry_run, "starting throttler");

    let supervisor = shutdown::Supervisor::new();
    let health = Health::new();

    let http_client = reqwest::Client::new();
    let cluster = Arc::new(HttpClusterApi::new(http_client, config.elasticsearch_url.clone()));
    let cloud = Arc::new(AwsCloudApi::from_env().await);

    health.set_ready(true);

    let serve_handle = {
        let addr = config.serve_addr.clone();
        let health = health.clone();
        tokio::spawn(async move { metrics_server::serve(&addr, health).await })
    };

    let mut gate = ClusterStateGate::new(cluster, cloud, &config.groups, config.dry_run);
    let token = supervisor.token();
    let interval = Duration::from_secs(config.interval_secs);
    let gate_handle = tokio::spawn(async move { run_gate_loop(&mut gate, interval, token).await });

    supervisor.wait().await;
    supervisor.cancel();

    let _ = gate_handle.await;
    serve_handle.abort();

    tracing::info!("throttler shut down");
    Ok(())
}

async fn run_gate_loop<CL, CA>(
    gate: &mut ClusterStateGate<CL, CA>,
    interval: Duration,
    cancel: tokio_util::sync::CancellationToken,
) where
    CL: escp_cluster::ClusterApi,
    CA: escp_cloud::CloudApi,
{
    if let Err(err) = gate.tick().await {
        tracing::error!(%err, "initial cluster-state gate tick failed");
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(err) = gate.tick().await {
                    tracing::error!(%err, "cluster-state gate tick failed");
                }
            }
        }
    }
}
