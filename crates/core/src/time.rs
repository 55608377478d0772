// SPDX-License-Identifier: MIT

//! Duration constants for the retention engine (§3).
//!
//! These are explicit design choices, not the platform's calendar: a
//! "month" here is exactly `year / 12`, not a variable-length calendar
//! month, so bucket widths are stable regardless of which months a
//! snapshot's age happens to span.

use std::time::Duration;

pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// `365.2425 * day`, truncated to whole seconds.
pub const YEAR: Duration = Duration::from_secs(31_556_952);
/// `year / 12`.
pub const MONTH: Duration = Duration::from_secs(31_556_952 / 12);
