// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHealth {
    pub status: HealthStatus,
    pub relocating_shards: u64,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub roles: Vec<String>,
    pub ip: String,
    pub host: String,
    pub attributes: BTreeMap<String, String>,
}

/// One row of `_cat/shards`. `node_raw` is the unparsed node column, fed to
/// [`escp_core::parse_shard_location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRow {
    pub index: String,
    pub shard: String,
    pub state: String,
    pub node_raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSettings {
    pub transient: BTreeMap<String, String>,
    pub persistent: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub name: String,
    pub state: String,
}

/// Summarized `_recovery` response: just the set of shard recovery types
/// in flight, enough for the throttler's "anyRecoveryFromStore" check
/// (§4.5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    pub shard_types: Vec<String>,
}

impl RecoverySummary {
    pub fn any_recovery_from_store(&self) -> bool {
        self.shard_types.iter().any(|t| t == "store")
    }
}
