// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Ambient infrastructure shared by the drainer, throttler, and snapshooter
//! binaries: logging, health/metrics HTTP endpoints, shutdown/supervisor
//! wiring, and configuration errors.

pub mod config;
pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod shutdown;

pub use config::ConfigError;
pub use health::Health;
pub use shutdown::Supervisor;
