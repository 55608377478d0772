// SPDX-License-Identifier: MIT

//! Shared configuration error type (§7 "Configuration" error kind: "missing
//! required flag, mutually inconsistent flags… Fatal at startup.").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
}
