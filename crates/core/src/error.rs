// SPDX-License-Identifier: MIT

//! Shared error types for the control plane's core crates.

use thiserror::Error;

/// Errors raised while assembling or interpreting a cluster state snapshot.
#[derive(Debug, Error)]
pub enum ClusterStateError {
    #[error("shard catalog entry has unexpected shape: {0:?}")]
    UnexpectedShardShape(String),

    #[error("node list from cluster API was not sorted: {0:?}")]
    UnsortedNodes(Vec<String>),
}

/// Errors raised while decoding a `CloudEvent` envelope or its detail.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("missing required envelope field `{0}`")]
    MissingField(&'static str),

    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the lifecycle postponer.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PostponeError {
    #[error("postponement cancelled")]
    Cancelled,

    #[error("global timeout elapsed before the action completed")]
    Timeout,
}
