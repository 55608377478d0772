// SPDX-License-Identifier: MIT

//! Drain Coordinator (§4.3): consumes decoded cloud events, excludes
//! condemned nodes from shard allocation, and postpones termination
//! lifecycle actions until the node drains or a global deadline elapses.

use crate::postponer::Postponer;
use escp_cloud::{CloudApi, LifecycleActionResult};
use escp_cluster::{name_patch, ClusterApi, ClusterApiError};
use escp_core::{Clock, CloudEventDetail, Event, EventBus, HookCache, LifecycleAction, PostponeError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Spot-interruption micro-batching window (§4.3, §5): up to 20 events or
/// 10 ms, whichever comes first.
pub const SPOT_BATCH_MAX: usize = 20;
pub const SPOT_BATCH_WINDOW: Duration = Duration::from_millis(10);

pub struct DrainCoordinator<CL: ClusterApi, CA: CloudApi, CK: Clock> {
    cluster: Arc<CL>,
    cloud: Arc<CA>,
    clock: CK,
    bus: EventBus,
    hook_cache: Arc<HookCache<CK>>,
}

impl<CL: ClusterApi, CA: CloudApi, CK: Clock> DrainCoordinator<CL, CA, CK> {
    pub fn new(cluster: Arc<CL>, cloud: Arc<CA>, clock: CK, bus: EventBus, hook_cache: Arc<HookCache<CK>>) -> Self {
        Self { cluster, cloud, clock, bus, hook_cache }
    }

    /// §4.3 "Spot interruptions": add all instance IDs in the batch to the
    /// by-name exclusion list in a single merged update.
    pub async fn drain_names(&self, instance_ids: impl IntoIterator<Item = String>) -> Result<(), ClusterApiError> {
        let settings = self.cluster.cluster_get_settings().await?;
        let mut exclusions = escp_cluster::parse_exclusions(&settings.transient);
        exclusions.drain_names(instance_ids);
        self.cluster.cluster_put_settings(name_patch(&exclusions)).await
    }

    /// §4.3 "Termination lifecycle actions", steps 1–5.
    pub async fn handle_termination(&self, action: LifecycleAction, cancel: CancellationToken) {
        if let Err(err) = self.drain_names([action.instance_id.clone()]).await {
            tracing::error!(%err, instance_id = %action.instance_id, "failed to add termination exclusion");
            return;
        }

        let postponer = Postponer::new(self.cloud.clone(), self.clock.clone(), self.hook_cache.clone());
        let postpone_cancel = CancellationToken::new();

        let (empty_ticket, mut empty_sub) = self.bus.subscribe(Event::NodeEmpty(action.instance_id.clone()).topic());
        let (removed_ticket, mut removed_sub) = self.bus.subscribe(Event::NodeRemoved(action.instance_id.clone()).topic());

        let postpone_fut = postponer.postpone(&action, postpone_cancel.clone());
        tokio::pin!(postpone_fut);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                postpone_cancel.cancel();
                None
            }
            Some((_, ack)) = empty_sub.recv() => {
                ack.ack();
                postpone_cancel.cancel();
                Some(Ok(()))
            }
            Some((_, ack)) = removed_sub.recv() => {
                ack.ack();
                postpone_cancel.cancel();
                Some(Ok(()))
            }
            result = &mut postpone_fut => Some(Err(result)),
        };
        drop((empty_ticket, removed_ticket));

        match outcome {
            Some(Err(PostponeError::Timeout)) => {
                tracing::error!(instance_id = %action.instance_id, token = %action.token, "lifecycle action globally timed out before node drained");
                return;
            }
            Some(Err(PostponeError::Cancelled)) | Some(Ok(())) => {}
            None => {
                // Outer cancellation: the postponer future has already
                // been told to stop; wait for it to unwind before
                // returning so its cancellation is observed cleanly.
                let _ = postpone_fut.await;
                return;
            }
        }

        if let Err(err) = self
            .cloud
            .complete_lifecycle_action(&action.group, &action.hook, &action.token, &action.instance_id, LifecycleActionResult::Continue)
            .await
        {
            tracing::warn!(%err, token = %action.token, "failed to complete lifecycle action");
        }
    }
}

/// Consume events from the bus, routing spot interruptions into a
/// micro-batcher and termination actions into one task per action (§4.3,
/// §5 "one transient task per in-flight termination action").
pub async fn run<CL: ClusterApi + 'static, CA: CloudApi + 'static, CK: Clock>(
    coordinator: Arc<DrainCoordinator<CL, CA, CK>>,
    bus: EventBus,
    cancel: CancellationToken,
) {
    run_with_batch_params(coordinator, bus, cancel, SPOT_BATCH_MAX, SPOT_BATCH_WINDOW).await
}

/// As [`run`], with the spot-interruption micro-batch size/window
/// overridable (§6 CLI surface: these are configurable per-binary knobs,
/// not compiled-in constants).
pub async fn run_with_batch_params<CL: ClusterApi + 'static, CA: CloudApi + 'static, CK: Clock>(
    coordinator: Arc<DrainCoordinator<CL, CA, CK>>,
    bus: EventBus,
    cancel: CancellationToken,
    batch_max: usize,
    batch_window: Duration,
) {
    let (spot_tx, spot_rx) = mpsc::channel::<String>(256);
    let batcher = tokio::spawn(run_spot_batcher(coordinator.clone(), spot_rx, cancel.clone(), batch_max, batch_window));

    let (_ticket_spot, mut spot_sub) = bus.subscribe("aws.ec2:EC2 Spot Instance Interruption Warning");
    let (_ticket_term, mut term_sub) = bus.subscribe("aws.autoscaling:EC2 Instance-terminate Lifecycle Action");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some((event, ack)) = spot_sub.recv() => {
                if let Event::Cloud(cloud_event) = &event {
                    if let CloudEventDetail::SpotInterruption { instance_id, .. } = &cloud_event.detail {
                        let _ = spot_tx.send(instance_id.clone()).await;
                    }
                }
                ack.ack();
            }
            Some((event, ack)) = term_sub.recv() => {
                ack.ack();
                if let Event::Cloud(cloud_event) = event {
                    if let CloudEventDetail::TerminationLifecycleAction {
                        autoscaling_group_name, lifecycle_hook_name, token, instance_id, lifecycle_transition,
                    } = cloud_event.detail {
                        let action = LifecycleAction {
                            group: autoscaling_group_name,
                            hook: lifecycle_hook_name,
                            token,
                            instance_id,
                            transition: lifecycle_transition,
                            start_time: coordinator.clock.now(),
                        };
                        let coordinator = coordinator.clone();
                        let cancel = cancel.clone();
                        tokio::spawn(async move { coordinator.handle_termination(action, cancel).await });
                    }
                }
            }
        }
    }
    drop(spot_tx);
    let _ = batcher.await;
}

async fn run_spot_batcher<CL: ClusterApi, CA: CloudApi, CK: Clock>(
    coordinator: Arc<DrainCoordinator<CL, CA, CK>>,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
    batch_max: usize,
    batch_window: Duration,
) {
    loop {
        let first = tokio::select! {
            _ = cancel.cancelled() => return,
            received = rx.recv() => match received {
                Some(id) => id,
                None => return,
            },
        };

        let mut batch = vec![first];
        let deadline = tokio::time::sleep(batch_window);
        tokio::pin!(deadline);
        while batch.len() < batch_max {
            tokio::select! {
                _ = &mut deadline => break,
                received = rx.recv() => match received {
                    Some(id) => batch.push(id),
                    None => break,
                },
            }
        }

        if let Err(err) = coordinator.drain_names(batch.clone()).await {
            tracing::error!(%err, count = batch.len(), "failed to apply spot-interruption exclusion batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escp_cloud::FakeCloudApi;
    use escp_cluster::FakeClusterApi;
    use escp_core::FakeClock;

    fn coordinator() -> (Arc<DrainCoordinator<FakeClusterApi, FakeCloudApi, FakeClock>>, Arc<FakeClusterApi>, Arc<FakeCloudApi>, EventBus) {
        let cluster = Arc::new(FakeClusterApi::new());
        let cloud = Arc::new(FakeCloudApi::new());
        let clock = FakeClock::new();
        let bus = EventBus::new();
        let hook_cache = Arc::new(HookCache::new(clock.clone(), Duration::from_secs(3600), 10));
        let coordinator = Arc::new(DrainCoordinator::new(cluster.clone(), cloud.clone(), clock, bus.clone(), hook_cache));
        (coordinator, cluster, cloud, bus)
    }

    #[tokio::test]
    async fn drain_names_merges_into_existing_exclusions() {
        let (coordinator, cluster, _cloud, _bus) = coordinator();
        cluster
            .cluster_put_settings(std::collections::BTreeMap::from([(
                "cluster.routing.allocation.exclude._name".to_string(),
                "i-existing".to_string(),
            )]))
            .await
            .unwrap();

        coordinator.drain_names(["i-new".to_string()]).await.unwrap();

        let value = cluster.transient().get("cluster.routing.allocation.exclude._name").unwrap().clone();
        let mut entries: Vec<&str> = value.split(',').collect();
        entries.sort();
        assert_eq!(entries, vec!["i-existing", "i-new"]);
    }

    #[tokio::test]
    async fn drain_is_idempotent_for_repeated_instance() {
        let (coordinator, cluster, _cloud, _bus) = coordinator();
        coordinator.drain_names(["i-abc".to_string()]).await.unwrap();
        coordinator.drain_names(["i-abc".to_string()]).await.unwrap();
        let value = cluster.transient().get("cluster.routing.allocation.exclude._name").unwrap().clone();
        assert_eq!(value, "i-abc");
    }

    #[tokio::test]
    async fn termination_completes_continue_when_node_empties() {
        let (coordinator, cluster, cloud, bus) = coordinator();
        let action = LifecycleAction {
            group: "my-asg".into(),
            hook: "my-hook".into(),
            token: "token-1".into(),
            instance_id: "i-abc".into(),
            transition: "autoscaling:EC2_INSTANCE_TERMINATING".into(),
            start_time: std::time::Instant::now(),
        };

        let handle = {
            let coordinator = coordinator.clone();
            let action = action.clone();
            tokio::spawn(async move { coordinator.handle_termination(action, CancellationToken::new()).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        bus.publish(Event::NodeEmpty("i-abc".into())).await;
        handle.await.unwrap();

        assert!(cluster.transient().get("cluster.routing.allocation.exclude._name").unwrap().contains("i-abc"));
        let completions = cloud.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].4, LifecycleActionResult::Continue);
    }
}
