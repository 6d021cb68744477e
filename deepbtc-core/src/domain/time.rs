//! UTC timestamp helpers shared by fetchers, the store and the feature engine.
//!
//! All timestamps are naive UTC (`NaiveDateTime`). Daily observations are
//! pinned to 00:00:00 of their day.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// On-disk timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp for CSV output.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp cell. Accepts the canonical format, an ISO `T`
/// separator, an optional trailing UTC offset, or a bare date.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let s = s
        .strip_suffix("+00:00")
        .or_else(|| s.strip_suffix('Z'))
        .unwrap_or(s);
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(start_of_day)
        })
}

/// Midnight of `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Truncate a timestamp to 00:00:00 of its day.
pub fn floor_day(ts: NaiveDateTime) -> NaiveDateTime {
    start_of_day(ts.date())
}

/// Round a timestamp up to the next 00:00:00; midnight stays put.
pub fn ceil_day(ts: NaiveDateTime) -> NaiveDateTime {
    let floor = floor_day(ts);
    if floor == ts {
        ts
    } else {
        floor + chrono::Duration::days(1)
    }
}

/// Truncate a timestamp to the start of its hour.
pub fn floor_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or_else(|| floor_day(ts))
}

pub fn from_unix_seconds(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

pub fn from_unix_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

pub fn to_unix_seconds(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

pub fn to_unix_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}
