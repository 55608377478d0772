// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from the SQS/Autoscaling adapter (§4.1, §4.3, §4.4, §4.5).
#[derive(Debug, Error)]
pub enum CloudApiError {
    #[error("transport error calling the cloud platform: {0}")]
    Transport(String),

    /// A validation error returned by the platform, carrying its message
    /// verbatim so callers can pattern-match on it (§4.4 step 3).
    #[error("platform validation error: {0}")]
    Validation(String),
}

const NO_ACTIVE_LIFECYCLE_ACTION: &str = "No active Lifecycle Action found with token";

impl CloudApiError {
    /// True when this is the specific heartbeat/complete error that means
    /// the lifecycle action already timed out on the platform side (§4.4).
    pub fn is_no_active_lifecycle_action(&self) -> bool {
        matches!(self, CloudApiError::Validation(msg) if msg.contains(NO_ACTIVE_LIFECYCLE_ACTION))
    }
}
