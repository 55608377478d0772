// SPDX-License-Identifier: MIT

//! Top-level error type for the snapshooter binary (§7).

use escp_cluster::ClusterApiError;
use escp_common::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshooterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cluster(#[from] ClusterApiError),

    #[error("repository {name:?} exists with type {existing:?}, expected {expected:?}")]
    RepositoryTypeMismatch { name: String, existing: String, expected: String },
}
