// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cluster REST adapter (§4.8) — out of scope for the core engineering per
//! the specification, but its shape constrains everything the Cluster-State
//! Tracker, Drain Coordinator, Cluster-State Gate, and Snapshot Orchestrator
//! depend on, so it's expressed here as a trait with a real HTTP
//! implementation and a fake for tests.

mod error;
mod exclusions;
mod fake;
mod http;
mod types;

pub use error::ClusterApiError;
pub use exclusions::{name_patch, parse as parse_exclusions};
pub use fake::FakeClusterApi;
pub use http::HttpClusterApi;
pub use types::{ClusterHealth, ClusterSettings, HealthStatus, NodeInfo, RecoverySummary, ShardRow, SnapshotInfo};

use async_trait::async_trait;
use std::collections::BTreeMap;

/// The set of operations the core requires from the cluster (§4.8).
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn cluster_health(&self) -> Result<ClusterHealth, ClusterApiError>;
    async fn nodes_info(&self) -> Result<Vec<NodeInfo>, ClusterApiError>;
    async fn nodes_stats(&self, metrics: &[&str]) -> Result<serde_json::Value, ClusterApiError>;
    async fn cat_shards(&self) -> Result<Vec<ShardRow>, ClusterApiError>;
    async fn cluster_get_settings(&self) -> Result<ClusterSettings, ClusterApiError>;
    async fn cluster_put_settings(&self, transient: BTreeMap<String, String>) -> Result<(), ClusterApiError>;
    async fn snapshot_get_repository(&self, name: &str) -> Result<Option<serde_json::Value>, ClusterApiError>;
    async fn snapshot_create_repository(
        &self,
        name: &str,
        repo_type: &str,
        settings: serde_json::Value,
    ) -> Result<(), ClusterApiError>;
    async fn snapshot_create(&self, repo: &str, name: &str, wait_for_completion: bool) -> Result<(), ClusterApiError>;
    async fn snapshot_get(&self, repo: &str) -> Result<Vec<SnapshotInfo>, ClusterApiError>;
    async fn snapshot_delete(&self, repo: &str, name: &str) -> Result<(), ClusterApiError>;
    async fn indices_recovery(&self, active_only: bool, detailed: bool) -> Result<RecoverySummary, ClusterApiError>;
}
