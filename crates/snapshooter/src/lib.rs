// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Library surface for the `snapshooter` binary (§4.7).

pub mod config;
pub mod error;
pub mod naming;
pub mod orchestrator;

pub use config::SnapshooterConfig;
pub use error::SnapshooterError;
pub use orchestrator::{next_aligned_tick, SnapshotOrchestrator, TickOutcome};
