// SPDX-License-Identifier: MIT

//! Command-line surface (§6 "CLI surface (illustrative, not normative)").

use clap::Parser;
use escp_common::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "throttler", about = "Suspends or resumes autoscaling groups based on cluster health")]
pub struct ThrottlerConfig {
    /// Autoscaling group name to gate. Repeatable.
    #[arg(long = "group", env = "THROTTLER_GROUPS", value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Cluster-health poll tick, in seconds.
    #[arg(long, env = "THROTTLER_INTERVAL_SECS", default_value_t = 30)]
    pub interval_secs: u64,

    /// Elasticsearch endpoint.
    #[arg(long, env = "THROTTLER_ELASTICSEARCH_URL")]
    pub elasticsearch_url: String,

    /// Evaluate health and log the decision without calling the cloud
    /// platform (§6 CLI surface: `--dry-run`).
    #[arg(long, env = "THROTTLER_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, env = "THROTTLER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Bind address for `/livez`, `/readyz`, `/metrics`.
    #[arg(long, env = "THROTTLER_SERVE_ADDR", default_value = "0.0.0.0:8080")]
    pub serve_addr: String,
}

impl ThrottlerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.groups.is_empty() {
            return Err(ConfigError::Missing("group"));
        }
        if self.elasticsearch_url.trim().is_empty() {
            return Err(ConfigError::Missing("elasticsearch-url"));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Inconsistent("interval-secs must be > 0".to_string()));
        }
        Ok(())
    }
}
