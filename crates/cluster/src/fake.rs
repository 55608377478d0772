// SPDX-License-Identifier: MIT

//! In-memory [`ClusterApi`] for exercising the Cluster-State Tracker, Drain
//! Coordinator, Cluster-State Gate, and Snapshot Orchestrator without a
//! real cluster.

use crate::error::ClusterApiError;
use crate::types::{ClusterHealth, ClusterSettings, NodeInfo, RecoverySummary, ShardRow, SnapshotInfo};
use crate::ClusterApi;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct State {
    health: ClusterHealth,
    nodes: Vec<NodeInfo>,
    shards: Vec<ShardRow>,
    transient: BTreeMap<String, String>,
    persistent: BTreeMap<String, String>,
    repositories: BTreeMap<String, serde_json::Value>,
    snapshots: BTreeMap<String, Vec<SnapshotInfo>>,
    recovery: RecoverySummary,
}

impl Default for ClusterHealth {
    fn default() -> Self {
        ClusterHealth { status: crate::types::HealthStatus::Green, relocating_shards: 0, timed_out: false }
    }
}

/// Fake cluster for tests. Every method is infallible unless configured
/// otherwise via [`FakeClusterApi::fail_next`].
#[derive(Default, Clone)]
pub struct FakeClusterApi {
    state: std::sync::Arc<Mutex<State>>,
}

impl FakeClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_health(&self, health: ClusterHealth) {
        self.state.lock().health = health;
    }

    pub fn set_nodes(&self, nodes: Vec<NodeInfo>) {
        self.state.lock().nodes = nodes;
    }

    pub fn set_shards(&self, shards: Vec<ShardRow>) {
        self.state.lock().shards = shards;
    }

    pub fn set_transient(&self, transient: BTreeMap<String, String>) {
        self.state.lock().transient = transient;
    }

    pub fn transient(&self) -> BTreeMap<String, String> {
        self.state.lock().transient.clone()
    }

    pub fn set_recovery(&self, recovery: RecoverySummary) {
        self.state.lock().recovery = recovery;
    }

    pub fn put_snapshots(&self, repo: &str, snapshots: Vec<SnapshotInfo>) {
        self.state.lock().snapshots.insert(repo.to_string(), snapshots);
    }
}

#[async_trait]
impl ClusterApi for FakeClusterApi {
    async fn cluster_health(&self) -> Result<ClusterHealth, ClusterApiError> {
        Ok(self.state.lock().health.clone())
    }

    async fn nodes_info(&self) -> Result<Vec<NodeInfo>, ClusterApiError> {
        Ok(self.state.lock().nodes.clone())
    }

    async fn nodes_stats(&self, _metrics: &[&str]) -> Result<serde_json::Value, ClusterApiError> {
        Ok(serde_json::Value::Null)
    }

    async fn cat_shards(&self) -> Result<Vec<ShardRow>, ClusterApiError> {
        Ok(self.state.lock().shards.clone())
    }

    async fn cluster_get_settings(&self) -> Result<ClusterSettings, ClusterApiError> {
        let state = self.state.lock();
        Ok(ClusterSettings { transient: state.transient.clone(), persistent: state.persistent.clone() })
    }

    async fn cluster_put_settings(&self, transient: BTreeMap<String, String>) -> Result<(), ClusterApiError> {
        let mut state = self.state.lock();
        for (key, value) in transient {
            if value.is_empty() {
                state.transient.remove(&key);
            } else {
                state.transient.insert(key, value);
            }
        }
        Ok(())
    }

    async fn snapshot_get_repository(&self, name: &str) -> Result<Option<serde_json::Value>, ClusterApiError> {
        Ok(self.state.lock().repositories.get(name).cloned())
    }

    async fn snapshot_create_repository(
        &self,
        name: &str,
        repo_type: &str,
        settings: serde_json::Value,
    ) -> Result<(), ClusterApiError> {
        self.state.lock().repositories.insert(name.to_string(), serde_json::json!({ "type": repo_type, "settings": settings }));
        Ok(())
    }

    async fn snapshot_create(&self, repo: &str, name: &str, _wait_for_completion: bool) -> Result<(), ClusterApiError> {
        self.state.lock().snapshots.entry(repo.to_string()).or_default().push(SnapshotInfo {
            name: name.to_string(),
            state: "SUCCESS".to_string(),
        });
        Ok(())
    }

    async fn snapshot_get(&self, repo: &str) -> Result<Vec<SnapshotInfo>, ClusterApiError> {
        Ok(self.state.lock().snapshots.get(repo).cloned().unwrap_or_default())
    }

    async fn snapshot_delete(&self, repo: &str, name: &str) -> Result<(), ClusterApiError> {
        if let Some(snaps) = self.state.lock().snapshots.get_mut(repo) {
            snaps.retain(|s| s.name != name);
        }
        Ok(())
    }

    async fn indices_recovery(&self, _active_only: bool, _detailed: bool) -> Result<RecoverySummary, ClusterApiError> {
        Ok(self.state.lock().recovery.clone())
    }
}
