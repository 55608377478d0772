// SPDX-License-Identifier: MIT

//! snapshooter: creates Elasticsearch snapshots on a fixed cadence and
//! prunes old ones per a tiered retention policy (§1, §4.6, §4.7).

use clap::Parser;
use escp_cluster::HttpClusterApi;
use escp_common::{logging, metrics_server, shutdown, Health};
use metrics::counter;
use snapshooter::{next_aligned_tick, SnapshooterConfig, SnapshotOrchestrator};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SnapshooterConfig::parse();
    config.validate()?;

    logging::init(&config.log_level);
    let policy = config.policy();
    tracing::info!(repo = %config.repo_name, ?policy, dry_run = config.dry_run, "starting snapshooter");

    let supervisor = shutdown::Supervisor::new();
    let health = Health::new();

    let http_client = reqwest::Client::new();
    let cluster = Arc::new(HttpClusterApi::new(http_client, config.elasticsearch_url.clone()));

    let orchestrator = Arc::new(SnapshotOrchestrator::new(
        cluster,
        config.repo_name.clone(),
        config.repo_type.clone(),
        serde_json::Value::Object(config.repo_settings_map().into_iter().map(|(k, v)| (k, serde_json::Value::String(v))).collect()),
        policy,
        config.delete,
        config.dry_run,
    ));
    orchestrator.ensure_repository().await?;

    health.set_ready(true);

    let serve_handle = {
        let addr = config.serve_addr.clone();
        let health = health.clone();
        tokio::spawn(async move { metrics_server::serve(&addr, health).await })
    };

    let token = supervisor.token();
    let min_interval_secs = policy.min_interval();
    let tick_handle = tokio::spawn(async move { run_tick_loop(orchestrator, min_interval_secs, token).await });

    supervisor.wait().await;
    supervisor.cancel();

    let _ = tick_handle.await;
    serve_handle.abort();

    tracing::info!("snapshooter shut down");
    Ok(())
}

async fn run_tick_loop<C: escp_cluster::ClusterApi + 'static>(
    orchestrator: Arc<SnapshotOrchestrator<C>>,
    min_interval_secs: i64,
    cancel: tokio_util::sync::CancellationToken,
) {
    if min_interval_secs <= 0 {
        tracing::error!("retention policy has no non-zero tier; snapshooter has nothing to schedule");
        return;
    }

    loop {
        let now = chrono::Utc::now();
        let next = next_aligned_tick(now, min_interval_secs);
        let wait = (next - now).to_std().unwrap_or(Duration::from_secs(min_interval_secs as u64));

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(wait) => {
                match orchestrator.tick(next).await {
                    Ok(outcome) => {
                        counter!("snapshooter_snapshots_created_total").increment(1);
                        counter!("snapshooter_snapshots_deleted_total").increment(outcome.deleted.len() as u64);
                        tracing::info!(created = %outcome.created, considered = outcome.considered, deleted = outcome.deleted.len(), "snapshot tick complete");
                    }
                    Err(err) => tracing::error!(%err, "snapshot tick failed"),
                }
            }
        }
    }
}
