// SPDX-License-Identifier: MIT

//! `tracing` setup, shared across all three binaries (§1 "Out of
//! scope… logging setup").

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber reading level from `RUST_LOG`, falling
/// back to `default_level` (e.g. `"info"`) when unset.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
