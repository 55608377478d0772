// SPDX-License-Identifier: MIT

//! Top-level error type for the throttler binary (§7).

use escp_cloud::CloudApiError;
use escp_cluster::ClusterApiError;
use escp_common::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThrottlerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cluster(#[from] ClusterApiError),

    #[error(transparent)]
    Cloud(#[from] CloudApiError),
}
