// SPDX-License-Identifier: MIT

//! Snapshot name format (§6): `"<prefix>-YYYY-MM-DDtHH-MM-SS"`, UTC,
//! truncated to the second. Names not matching the prefix/format are
//! ignored by the retention engine.

use chrono::{DateTime, TimeZone, Utc};

const FORMAT: &str = "%Y-%m-%dt%H-%M-%S";

/// Build a snapshot name for `tick_time`, truncated to the second.
pub fn format_name(prefix: &str, tick_time: DateTime<Utc>) -> String {
    format!("{prefix}-{}", tick_time.format(FORMAT))
}

/// Parse a snapshot name back into its tick timestamp, returning `None`
/// if it doesn't match `prefix` or the expected format.
pub fn parse_name(prefix: &str, name: &str) -> Option<DateTime<Utc>> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;
    let naive = chrono::NaiveDateTime::parse_from_str(rest, FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips_through_format_and_parse() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 28, 13, 5, 9).single().unwrap();
        let name = format_name("escp-logs", ts);
        assert_eq!(name, "escp-logs-2026-07-28t13-05-09");
        assert_eq!(parse_name("escp-logs", &name), Some(ts));
    }

    #[test]
    fn truncates_subsecond_precision() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 28, 13, 5, 9).single().unwrap() + chrono::Duration::milliseconds(500);
        let name = format_name("escp-logs", ts);
        assert_eq!(name, "escp-logs-2026-07-28t13-05-09");
    }

    #[test]
    fn rejects_mismatched_prefix() {
        assert_eq!(parse_name("escp-logs", "other-2026-07-28t13-05-09"), None);
    }

    #[test]
    fn rejects_malformed_suffix() {
        assert_eq!(parse_name("escp-logs", "escp-logs-not-a-timestamp"), None);
    }
}
