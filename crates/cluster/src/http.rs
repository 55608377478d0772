// SPDX-License-Identifier: MIT

use crate::error::ClusterApiError;
use crate::types::{ClusterHealth, ClusterSettings, HealthStatus, NodeInfo, RecoverySummary, ShardRow, SnapshotInfo};
use crate::ClusterApi;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Talks to a real Elasticsearch cluster over its REST API.
pub struct HttpClusterApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClusterApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    async fn request(&self, method: Method, path: &str) -> Result<reqwest::Response, ClusterApiError> {
        let response = self.client.request(method, format!("{}{path}", self.base_url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterApiError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }

    async fn json_body(&self, method: Method, path: &str, body: serde_json::Value) -> Result<reqwest::Response, ClusterApiError> {
        let response = self.client.request(method, format!("{}{path}", self.base_url)).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterApiError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct HealthResponse {
    status: HealthStatus,
    relocating_shards: u64,
    timed_out: bool,
}

#[derive(Deserialize)]
struct NodesInfoResponse {
    nodes: BTreeMap<String, NodesInfoEntry>,
}

#[derive(Deserialize)]
struct NodesInfoEntry {
    name: String,
    #[serde(default)]
    roles: Vec<String>,
    ip: String,
    host: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct CatShardRow {
    index: String,
    shard: String,
    state: String,
    node: String,
}

#[derive(Deserialize)]
struct SettingsResponse {
    #[serde(default)]
    transient: serde_json::Value,
    #[serde(default)]
    persistent: serde_json::Value,
}

fn flatten_settings(value: &serde_json::Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                flatten_settings(v, &key, out);
            }
        }
        serde_json::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        serde_json::Value::Null => {}
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

#[async_trait]
impl ClusterApi for HttpClusterApi {
    async fn cluster_health(&self) -> Result<ClusterHealth, ClusterApiError> {
        let body: HealthResponse = self.request(Method::GET, "/_cluster/health").await?.json().await?;
        Ok(ClusterHealth { status: body.status, relocating_shards: body.relocating_shards, timed_out: body.timed_out })
    }

    async fn nodes_info(&self) -> Result<Vec<NodeInfo>, ClusterApiError> {
        let body: NodesInfoResponse = self.request(Method::GET, "/_nodes").await?.json().await?;
        Ok(body
            .nodes
            .into_values()
            .map(|n| NodeInfo { name: n.name, roles: n.roles, ip: n.ip, host: n.host, attributes: n.attributes })
            .collect())
    }

    async fn nodes_stats(&self, metrics: &[&str]) -> Result<serde_json::Value, ClusterApiError> {
        let path = if metrics.is_empty() { "/_nodes/stats".to_string() } else { format!("/_nodes/stats/{}", metrics.join(",")) };
        Ok(self.request(Method::GET, &path).await?.json().await?)
    }

    async fn cat_shards(&self) -> Result<Vec<ShardRow>, ClusterApiError> {
        let rows: Vec<CatShardRow> = self.request(Method::GET, "/_cat/shards?format=json").await?.json().await?;
        Ok(rows.into_iter().map(|r| ShardRow { index: r.index, shard: r.shard, state: r.state, node_raw: r.node }).collect())
    }

    async fn cluster_get_settings(&self) -> Result<ClusterSettings, ClusterApiError> {
        let body: SettingsResponse = self.request(Method::GET, "/_cluster/settings?flat_settings=true").await?.json().await?;
        let mut transient = BTreeMap::new();
        let mut persistent = BTreeMap::new();
        flatten_settings(&body.transient, "", &mut transient);
        flatten_settings(&body.persistent, "", &mut persistent);
        Ok(ClusterSettings { transient, persistent })
    }

    async fn cluster_put_settings(&self, transient: BTreeMap<String, String>) -> Result<(), ClusterApiError> {
        let body = serde_json::json!({ "transient": transient });
        self.json_body(Method::PUT, "/_cluster/settings", body).await?;
        Ok(())
    }

    async fn snapshot_get_repository(&self, name: &str) -> Result<Option<serde_json::Value>, ClusterApiError> {
        let response = self.client.get(format!("{}/_snapshot/{name}", self.base_url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterApiError::Status { status: status.as_u16(), body });
        }
        Ok(Some(response.json().await?))
    }

    async fn snapshot_create_repository(
        &self,
        name: &str,
        repo_type: &str,
        settings: serde_json::Value,
    ) -> Result<(), ClusterApiError> {
        let body = serde_json::json!({ "type": repo_type, "settings": settings });
        self.json_body(Method::PUT, &format!("/_snapshot/{name}"), body).await?;
        Ok(())
    }

    async fn snapshot_create(&self, repo: &str, name: &str, wait_for_completion: bool) -> Result<(), ClusterApiError> {
        self.request(Method::PUT, &format!("/_snapshot/{repo}/{name}?wait_for_completion={wait_for_completion}")).await?;
        Ok(())
    }

    async fn snapshot_get(&self, repo: &str) -> Result<Vec<SnapshotInfo>, ClusterApiError> {
        #[derive(Deserialize)]
        struct Response {
            snapshots: Vec<SnapshotEntry>,
        }
        #[derive(Deserialize)]
        struct SnapshotEntry {
            snapshot: String,
            state: String,
        }
        let body: Response = self.request(Method::GET, &format!("/_snapshot/{repo}/_all")).await?.json().await?;
        Ok(body.snapshots.into_iter().map(|s| SnapshotInfo { name: s.snapshot, state: s.state }).collect())
    }

    async fn snapshot_delete(&self, repo: &str, name: &str) -> Result<(), ClusterApiError> {
        self.request(Method::DELETE, &format!("/_snapshot/{repo}/{name}")).await?;
        Ok(())
    }

    async fn indices_recovery(&self, active_only: bool, detailed: bool) -> Result<RecoverySummary, ClusterApiError> {
        let path = format!("/_recovery?active_only={active_only}&detailed={detailed}");
        let body: serde_json::Value = self.request(Method::GET, &path).await?.json().await?;
        let mut shard_types = Vec::new();
        if let serde_json::Value::Object(indices) = &body {
            for index in indices.values() {
                if let Some(shards) = index.get("shards").and_then(|s| s.as_array()) {
                    for shard in shards {
                        if let Some(t) = shard.get("type").and_then(|t| t.as_str()) {
                            shard_types.push(t.to_string());
                        }
                    }
                }
            }
        }
        Ok(RecoverySummary { shard_types })
    }
}
