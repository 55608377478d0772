// SPDX-License-Identifier: MIT

//! Command-line surface (§6 "CLI surface (illustrative, not normative)").

use clap::Parser;
use escp_common::ConfigError;
use escp_core::RetentionPolicy;
use std::collections::BTreeMap;

#[derive(Debug, Parser)]
#[command(name = "snapshooter", about = "Creates and prunes Elasticsearch snapshots on a retention schedule")]
pub struct SnapshooterConfig {
    /// Snapshot repository name; also used as the snapshot name prefix.
    #[arg(long = "repo.name", env = "SNAPSHOOTER_REPO_NAME")]
    pub repo_name: String,

    /// Snapshot repository type, e.g. `s3`.
    #[arg(long = "repo.type", env = "SNAPSHOOTER_REPO_TYPE")]
    pub repo_type: String,

    /// Repository settings as `key=value`. Repeatable.
    #[arg(long = "repo.settings")]
    pub repo_settings: Vec<String>,

    #[arg(long, default_value_t = 0)]
    pub hourly: u32,

    #[arg(long, default_value_t = 0)]
    pub daily: u32,

    #[arg(long, default_value_t = 0)]
    pub weekly: u32,

    #[arg(long, default_value_t = 0)]
    pub monthly: u32,

    #[arg(long, default_value_t = 0)]
    pub yearly: u32,

    /// Actually delete snapshots in the delete set. Without this flag the
    /// orchestrator still creates snapshots but never prunes them.
    #[arg(long, env = "SNAPSHOOTER_DELETE", default_value_t = false)]
    pub delete: bool,

    /// Evaluate the retention decision and log it without calling the
    /// cluster to create or delete anything (§4.7 "dry-run mode").
    #[arg(long, env = "SNAPSHOOTER_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    /// Elasticsearch endpoint.
    #[arg(long, env = "SNAPSHOOTER_ELASTICSEARCH_URL")]
    pub elasticsearch_url: String,

    #[arg(long, env = "SNAPSHOOTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Bind address for `/livez`, `/readyz`, `/metrics`.
    #[arg(long, env = "SNAPSHOOTER_SERVE_ADDR", default_value = "0.0.0.0:8080")]
    pub serve_addr: String,
}

impl SnapshooterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repo_name.trim().is_empty() {
            return Err(ConfigError::Missing("repo.name"));
        }
        if self.repo_type.trim().is_empty() {
            return Err(ConfigError::Missing("repo.type"));
        }
        if self.elasticsearch_url.trim().is_empty() {
            return Err(ConfigError::Missing("elasticsearch-url"));
        }
        if self.policy().total() == 0 {
            return Err(ConfigError::Inconsistent("at least one of --hourly/--daily/--weekly/--monthly/--yearly must be non-zero".to_string()));
        }
        for setting in &self.repo_settings {
            if !setting.contains('=') {
                return Err(ConfigError::Inconsistent(format!("repo.settings entry {setting:?} is not in key=value form")));
            }
        }
        Ok(())
    }

    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.hourly, self.daily, self.weekly, self.monthly, self.yearly)
    }

    pub fn repo_settings_map(&self) -> BTreeMap<String, String> {
        self.repo_settings
            .iter()
            .filter_map(|kv| kv.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
