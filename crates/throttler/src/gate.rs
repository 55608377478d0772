// SPDX-License-Identifier: MIT

//! Cluster-State Gate (§4.5): classifies cluster health and idempotently
//! enables or disables autoscaling on each configured group.

use escp_cloud::{CloudApi, CloudApiError};
use escp_cluster::ClusterApi;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The AWS Autoscaling process this gate suspends/resumes: the mechanism
/// that lets CloudWatch alarms trigger scaling actions.
const ALARM_NOTIFICATION: &str = "AlarmNotification";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Enabled,
    Disabled,
}

/// Two-state state machine over one autoscaling group's alarm-notification
/// process (§4.5). A transition failure leaves the state unchanged and
/// surfaces the error; reaching the current state is always a no-op.
pub struct AutoscalingGroupGate<A: CloudApi> {
    cloud: Arc<A>,
    group: String,
    state: GateState,
}

impl<A: CloudApi> AutoscalingGroupGate<A> {
    /// New gates start disabled: the safe default until the first tick
    /// observes a healthy cluster.
    pub fn new(cloud: Arc<A>, group: impl Into<String>) -> Self {
        Self { cloud, group: group.into(), state: GateState::Disabled }
    }

    pub async fn enable(&mut self) -> Result<(), CloudApiError> {
        if self.state == GateState::Enabled {
            return Ok(());
        }
        self.cloud.resume_processes(&self.group, &[ALARM_NOTIFICATION]).await?;
        self.state = GateState::Enabled;
        Ok(())
    }

    pub async fn disable(&mut self) -> Result<(), CloudApiError> {
        if self.state == GateState::Disabled {
            return Ok(());
        }
        self.cloud.suspend_processes(&self.group, &[ALARM_NOTIFICATION]).await?;
        self.state = GateState::Disabled;
        Ok(())
    }

    #[cfg(test)]
    fn is_enabled(&self) -> bool {
        self.state == GateState::Enabled
    }
}

/// Drives a configured set of [`AutoscalingGroupGate`]s from cluster
/// health (§4.5 steps 1–3).
pub struct ClusterStateGate<CL: ClusterApi, CA: CloudApi> {
    cluster: Arc<CL>,
    gates: BTreeMap<String, AutoscalingGroupGate<CA>>,
    dry_run: bool,
}

impl<CL: ClusterApi, CA: CloudApi> ClusterStateGate<CL, CA> {
    pub fn new(cluster: Arc<CL>, cloud: Arc<CA>, groups: &[String], dry_run: bool) -> Self {
        let gates = groups.iter().map(|g| (g.clone(), AutoscalingGroupGate::new(cloud.clone(), g.clone()))).collect();
        Self { cluster, gates, dry_run }
    }

    /// §4.5 step 2: `good = status ∈ {yellow, green} ∧ relocatingShards == 0
    /// ∧ ¬anyRecoveryFromStore`.
    async fn is_good(&self) -> Result<bool, escp_cluster::ClusterApiError> {
        let (health, recovery) = tokio::try_join!(self.cluster.cluster_health(), self.cluster.indices_recovery(true, false))?;
        let good = !matches!(health.status, escp_cluster::HealthStatus::Red)
            && health.relocating_shards == 0
            && !recovery.any_recovery_from_store();
        Ok(good)
    }

    /// §4.5 steps 1–3, run once per tick.
    pub async fn tick(&mut self) -> Result<(), escp_cluster::ClusterApiError> {
        let good = self.is_good().await?;
        tracing::info!(good, dry_run = self.dry_run, "cluster health evaluated");

        if self.dry_run {
            return Ok(());
        }

        for (group, gate) in &mut self.gates {
            let result = if good { gate.enable().await } else { gate.disable().await };
            if let Err(err) = result {
                tracing::error!(%err, %group, good, "failed to transition autoscaling group gate");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escp_cloud::FakeCloudApi;
    use escp_cluster::{ClusterHealth, FakeClusterApi, HealthStatus, RecoverySummary};

    #[tokio::test]
    async fn enable_is_idempotent_after_first_success() {
        let cloud = Arc::new(FakeCloudApi::new());
        let mut gate = AutoscalingGroupGate::new(cloud.clone(), "asg-1");
        gate.enable().await.unwrap();
        gate.enable().await.unwrap();
        assert!(gate.is_enabled());
        assert!(cloud.suspended_processes("asg-1").is_empty());
    }

    #[tokio::test]
    async fn disable_then_enable_round_trips_through_cloud_calls() {
        let cloud = Arc::new(FakeCloudApi::new());
        let mut gate = AutoscalingGroupGate::new(cloud.clone(), "asg-1");
        gate.enable().await.unwrap();
        gate.disable().await.unwrap();
        assert!(cloud.suspended_processes("asg-1").contains("AlarmNotification"));
        gate.enable().await.unwrap();
        assert!(cloud.suspended_processes("asg-1").is_empty());
    }

    #[tokio::test]
    async fn green_and_no_relocation_enables_all_groups() {
        let cluster = Arc::new(FakeClusterApi::new());
        cluster.set_health(ClusterHealth { status: HealthStatus::Green, relocating_shards: 0, timed_out: false });
        cluster.set_recovery(RecoverySummary { shard_types: vec![] });
        let cloud = Arc::new(FakeCloudApi::new());
        let mut gate = ClusterStateGate::new(cluster, cloud.clone(), &["asg-1".to_string(), "asg-2".to_string()], false);

        gate.tick().await.unwrap();
        assert!(gate.gates.values().all(|g| g.is_enabled()));
    }

    #[tokio::test]
    async fn store_recovery_disables_groups_even_when_green() {
        let cluster = Arc::new(FakeClusterApi::new());
        cluster.set_health(ClusterHealth { status: HealthStatus::Yellow, relocating_shards: 0, timed_out: false });
        cluster.set_recovery(RecoverySummary { shard_types: vec!["store".to_string()] });
        let cloud = Arc::new(FakeCloudApi::new());
        let mut gate = ClusterStateGate::new(cluster, cloud.clone(), &["asg-1".to_string()], false);

        gate.tick().await.unwrap();
        assert!(!gate.gates.values().next().unwrap().is_enabled());
        assert!(cloud.suspended_processes("asg-1").contains("AlarmNotification"));
    }

    #[tokio::test]
    async fn dry_run_never_calls_the_cloud() {
        let cluster = Arc::new(FakeClusterApi::new());
        cluster.set_health(ClusterHealth { status: HealthStatus::Green, relocating_shards: 0, timed_out: false });
        let cloud = Arc::new(FakeCloudApi::new());
        let mut gate = ClusterStateGate::new(cluster, cloud.clone(), &["asg-1".to_string()], true);

        gate.tick().await.unwrap();
        assert!(!gate.gates.values().next().unwrap().is_enabled());
        assert!(cloud.suspended_processes("asg-1").is_empty());
    }
}
