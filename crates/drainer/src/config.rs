// SPDX-License-Identifier: MIT

//! Command-line surface (§6 "CLI surface (illustrative, not normative)").

use clap::Parser;
use escp_common::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "drainer", about = "Evacuates shards off nodes slated for termination")]
pub struct DrainerConfig {
    /// SQS queue URL to long-poll for spot interruption and lifecycle events.
    #[arg(long, env = "DRAINER_QUEUE")]
    pub queue: String,

    /// Cluster-state refresh tick, in seconds.
    #[arg(long, env = "DRAINER_INTERVAL_SECS", default_value_t = 60)]
    pub interval_secs: u64,

    /// Elasticsearch endpoint.
    #[arg(long, env = "DRAINER_ELASTICSEARCH_URL")]
    pub elasticsearch_url: String,

    /// URL of the local node's own HTTP endpoint, HEAD-checked at startup
    /// (§1 "Local node health (drainer only)").
    #[arg(long, env = "DRAINER_LOCAL_NODE_URL")]
    pub local_node_url: String,

    /// Name this node registers under in `_nodes/info`.
    #[arg(long, env = "DRAINER_LOCAL_NODE_NAME")]
    pub local_node_name: String,

    #[arg(long, env = "DRAINER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Bind address for `/livez`, `/readyz`, `/metrics`.
    #[arg(long, env = "DRAINER_SERVE_ADDR", default_value = "0.0.0.0:8080")]
    pub serve_addr: String,

    /// Spot-interruption micro-batch size (§4.3: "up to 20 events").
    #[arg(long, env = "DRAINER_SPOT_BATCH_MAX", default_value_t = 20)]
    pub spot_batch_max: usize,

    /// Spot-interruption micro-batch window, in milliseconds (§4.3: "10 ms").
    #[arg(long, env = "DRAINER_SPOT_BATCH_WINDOW_MS", default_value_t = 10)]
    pub spot_batch_window_ms: u64,

    /// Lifecycle hook description cache TTL, in seconds (§3: "TTL long
    /// enough that hook parameters do not change in practice").
    #[arg(long, env = "DRAINER_HOOK_CACHE_TTL_SECS", default_value_t = 3600)]
    pub hook_cache_ttl_secs: u64,

    /// Lifecycle hook description cache capacity (§3: "≤10 entries").
    #[arg(long, env = "DRAINER_HOOK_CACHE_CAPACITY", default_value_t = 10)]
    pub hook_cache_capacity: usize,
}

impl DrainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.trim().is_empty() {
            return Err(ConfigError::Missing("queue"));
        }
        if self.elasticsearch_url.trim().is_empty() {
            return Err(ConfigError::Missing("elasticsearch-url"));
        }
        if self.local_node_url.trim().is_empty() {
            return Err(ConfigError::Missing("local-node-url"));
        }
        if self.local_node_name.trim().is_empty() {
            return Err(ConfigError::Missing("local-node-name"));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Inconsistent("interval-secs must be > 0".to_string()));
        }
        Ok(())
    }
}
