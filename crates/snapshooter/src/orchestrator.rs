// SPDX-License-Identifier: MIT

//! Snapshot Orchestrator (§4.7): ensures the configured repository exists,
//! then on each aligned tick creates a snapshot and prunes old ones per
//! the retention policy.

use crate::error::SnapshooterError;
use crate::naming::{format_name, parse_name};
use chrono::{DateTime, Utc};
use escp_cluster::ClusterApi;
use escp_core::RetentionPolicy;
use std::sync::Arc;

pub struct SnapshotOrchestrator<C: ClusterApi> {
    cluster: Arc<C>,
    repo_name: String,
    repo_type: String,
    repo_settings: serde_json::Value,
    policy: RetentionPolicy,
    delete_enabled: bool,
    dry_run: bool,
}

impl<C: ClusterApi> SnapshotOrchestrator<C> {
    pub fn new(
        cluster: Arc<C>,
        repo_name: impl Into<String>,
        repo_type: impl Into<String>,
        repo_settings: serde_json::Value,
        policy: RetentionPolicy,
        delete_enabled: bool,
        dry_run: bool,
    ) -> Self {
        Self { cluster, repo_name: repo_name.into(), repo_type: repo_type.into(), repo_settings, policy, delete_enabled, dry_run }
    }

    /// §4.7 contract preamble: create the repository if absent, fail if
    /// it exists with a mismatched type.
    pub async fn ensure_repository(&self) -> Result<(), SnapshooterError> {
        match self.cluster.snapshot_get_repository(&self.repo_name).await? {
            Some(existing) => {
                let existing_type = existing.get("type").and_then(|v| v.as_str()).unwrap_or_default();
                if existing_type != self.repo_type {
                    return Err(SnapshooterError::RepositoryTypeMismatch {
                        name: self.repo_name.clone(),
                        existing: existing_type.to_string(),
                        expected: self.repo_type.clone(),
                    });
                }
                Ok(())
            }
            None => {
                self.cluster.snapshot_create_repository(&self.repo_name, &self.repo_type, self.repo_settings.clone()).await?;
                Ok(())
            }
        }
    }

    /// One tick of §4.7 steps 1–5, run at `tick_time`.
    pub async fn tick(&self, tick_time: DateTime<Utc>) -> Result<TickOutcome, SnapshooterError> {
        let name = format_name(&self.repo_name, tick_time);

        if !self.dry_run {
            self.cluster.snapshot_create(&self.repo_name, &name, true).await?;
        }

        let snapshots = self.cluster.snapshot_get(&self.repo_name).await?;
        let timestamps: Vec<DateTime<Utc>> = snapshots.iter().filter_map(|s| parse_name(&self.repo_name, &s.name)).collect();

        let delete_set = escp_core::delete(&self.policy, &timestamps);
        let to_delete: Vec<String> = snapshots
            .iter()
            .filter(|s| parse_name(&self.repo_name, &s.name).is_some_and(|ts| delete_set.contains(&ts)))
            .map(|s| s.name.clone())
            .collect();

        if !self.dry_run && self.delete_enabled {
            for victim in &to_delete {
                self.cluster.snapshot_delete(&self.repo_name, victim).await?;
            }
        }

        Ok(TickOutcome { created: name, considered: timestamps.len(), deleted: to_delete })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub created: String,
    pub considered: usize,
    pub deleted: Vec<String>,
}

/// §9: the orchestrator's period is `policy.min_interval()`, fired on the
/// next wall-clock boundary aligned to that width, not a fixed offset
/// from startup.
pub fn next_aligned_tick(now: DateTime<Utc>, min_interval_secs: i64) -> DateTime<Utc> {
    if min_interval_secs <= 0 {
        return now;
    }
    let epoch = now.timestamp();
    let next = ((epoch / min_interval_secs) + 1) * min_interval_secs;
    DateTime::<Utc>::from_timestamp(next, 0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use escp_cluster::FakeClusterApi;

    fn policy() -> RetentionPolicy {
        RetentionPolicy::new(2, 0, 0, 0, 0)
    }

    #[tokio::test]
    async fn ensure_repository_creates_when_absent() {
        let cluster = Arc::new(FakeClusterApi::new());
        let orchestrator = SnapshotOrchestrator::new(cluster.clone(), "repo", "s3", serde_json::json!({}), policy(), true, false);
        orchestrator.ensure_repository().await.unwrap();
        assert!(cluster.snapshot_get_repository("repo").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn ensure_repository_rejects_type_mismatch() {
        let cluster = Arc::new(FakeClusterApi::new());
        cluster.snapshot_create_repository("repo", "fs", serde_json::json!({})).await.unwrap();
        let orchestrator = SnapshotOrchestrator::new(cluster, "repo", "s3", serde_json::json!({}), policy(), true, false);
        let err = orchestrator.ensure_repository().await.unwrap_err();
        assert!(matches!(err, SnapshooterError::RepositoryTypeMismatch { .. }));
    }

    #[tokio::test]
    async fn tick_creates_and_prunes_old_snapshots() {
        let cluster = Arc::new(FakeClusterApi::new());
        let t0 = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).single().unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).single().unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).single().unwrap();
        cluster.put_snapshots("repo", vec![
            escp_cluster::SnapshotInfo { name: format_name("repo", t0), state: "SUCCESS".to_string() },
            escp_cluster::SnapshotInfo { name: format_name("repo", t1), state: "SUCCESS".to_string() },
        ]);

        let orchestrator = SnapshotOrchestrator::new(cluster.clone(), "repo", "s3", serde_json::json!({}), policy(), true, false);
        let outcome = orchestrator.tick(t2).await.unwrap();

        assert_eq!(outcome.created, format_name("repo", t2));
        assert_eq!(outcome.considered, 3);
        let remaining = cluster.snapshot_get("repo").await.unwrap();
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_never_creates_or_deletes() {
        let cluster = Arc::new(FakeClusterApi::new());
        let orchestrator = SnapshotOrchestrator::new(cluster.clone(), "repo", "s3", serde_json::json!({}), policy(), true, true);
        let tick_time = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).single().unwrap();
        let outcome = orchestrator.tick(tick_time).await.unwrap();
        assert_eq!(outcome.considered, 0);
        assert!(cluster.snapshot_get("repo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_disabled_keeps_snapshots_past_retention() {
        let cluster = Arc::new(FakeClusterApi::new());
        let t0 = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).single().unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).single().unwrap();
        cluster.put_snapshots("repo", vec![escp_cluster::SnapshotInfo { name: format_name("repo", t0), state: "SUCCESS".to_string() }]);

        let orchestrator = SnapshotOrchestrator::new(cluster.clone(), "repo", "s3", serde_json::json!({}), policy(), false, false);
        let outcome = orchestrator.tick(t1).await.unwrap();
        assert!(!outcome.deleted.is_empty());
        assert_eq!(cluster.snapshot_get("repo").await.unwrap().len(), 2);
    }

    #[test]
    fn aligned_tick_lands_on_hour_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 10, 15, 0).single().unwrap();
        let next = next_aligned_tick(now, 3600);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).single().unwrap());
    }
}
