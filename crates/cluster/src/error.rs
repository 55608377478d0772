// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from the cluster REST adapter (§4.8).
///
/// `Transport` and `Status` are the "transient remote" error kind of §7:
/// the transport layer backs these off exponentially and only surfaces
/// them once retries are exhausted. `Decode` is a protocol error — the
/// cluster returned something this client doesn't understand.
#[derive(Debug, Error)]
pub enum ClusterApiError {
    #[error("transport error calling the cluster: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cluster returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode cluster response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClusterApiError {
    /// True for 5xx and rate-limit responses, the transient remote class
    /// the transport layer is expected to retry (§7).
    pub fn is_retryable(&self) -> bool {
        match self {
            ClusterApiError::Transport(_) => true,
            ClusterApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ClusterApiError::Decode(_) => false,
        }
    }
}
