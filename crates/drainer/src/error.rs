// SPDX-License-Identifier: MIT

//! Top-level error type for the drainer binary (§7).

use escp_cloud::CloudApiError;
use escp_cluster::ClusterApiError;
use escp_common::ConfigError;
use escp_core::{ClusterStateError, EventDecodeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cluster(#[from] ClusterApiError),

    #[error(transparent)]
    Cloud(#[from] CloudApiError),

    #[error(transparent)]
    ClusterState(#[from] ClusterStateError),

    #[error(transparent)]
    EventDecode(#[from] EventDecodeError),
}

impl DrainerError {
    /// Whether this error should bring the whole process down (§7
    /// "Propagation": "every task returns its first non-recoverable error
    /// to the supervisor, which cancels siblings and exits the process").
    ///
    /// Decode errors never reach here — the event source handles them
    /// inline (log + drop) and never returns them as a task failure.
    /// Everything else that surfaces from a long-running task loop is
    /// fatal by construction: transient-remote errors are retried below
    /// this layer by the transport, so what reaches `DrainerError` already
    /// exhausted its retries, and invariant violations are fatal per §7.
    pub fn is_fatal(&self) -> bool {
        true
    }
}
