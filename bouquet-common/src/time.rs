//! Timestamp utilities
//!
//! Timestamps are kept at millisecond precision so that a value written to
//! storage or CSV and read back compares equal to the original.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};

/// Get current UTC timestamp, truncated to milliseconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Current calendar date (UTC)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Format as ISO-8601 / RFC 3339 with millisecond precision and a `Z` suffix
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp in any offset, normalized to UTC
///
/// Sub-millisecond digits are dropped so the result formats back unchanged.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(3))
}
