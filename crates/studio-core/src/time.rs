//! Timestamp formatting.
//!
//! Studio stores timestamps as local-time strings with millisecond precision
//! (`2025-01-01 09:00:00.000`). The fixed width makes lexicographic order
//! equal chronological order, which the reply backfill relies on.

use chrono::{DateTime, Local, TimeZone};

/// Format used for every persisted timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Current local time as a persisted timestamp string.
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Format any timezone-aware instant.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}
