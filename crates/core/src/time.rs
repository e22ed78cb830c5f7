//! Timestamp range and display formatting
//!
//! Trace timestamps are integer milliseconds since the Unix epoch. The
//! supported range is `[MIN_SUPPORTED_TIMESTAMP_MS, MAX_SUPPORTED_TIMESTAMP_MS]`;
//! the upper limit is `i64::MAX` nanoseconds expressed in milliseconds, the
//! largest instant the ingestion path can represent.

use chrono::{DateTime, Utc};

/// Earliest supported timestamp (the epoch)
pub const MIN_SUPPORTED_TIMESTAMP_MS: i64 = 0;

/// Latest supported timestamp (2262-04-11T23:47:16.854Z)
pub const MAX_SUPPORTED_TIMESTAMP_MS: i64 = 9_223_372_036_854;

/// Display layout for derived timestamp strings
pub const DISPLAY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Check if `millis` falls inside the supported range.
pub fn is_supported(millis: i64) -> bool {
    (MIN_SUPPORTED_TIMESTAMP_MS..=MAX_SUPPORTED_TIMESTAMP_MS).contains(&millis)
}

/// Format milliseconds as an ISO-8601 UTC string with millisecond precision.
///
/// Returns `None` when the instant cannot be represented.
pub fn display_millis(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|t| t.format(DISPLAY_FORMAT).to_string())
}

/// Parse an RFC 3339 string into milliseconds since the epoch.
pub fn parse_rfc3339_millis(s: &str) -> Result<i64, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.timestamp_millis())
}
