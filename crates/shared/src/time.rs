//! Chat timestamp handling.
//!
//! The game process reports epoch integers without saying which unit it
//! used. Anything below 10^12 is taken as seconds, everything else as
//! milliseconds.

use chrono::{DateTime, FixedOffset};

pub const SECONDS_THRESHOLD: i64 = 1_000_000_000_000;

/// India Standard Time, UTC+05:30.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
}

pub fn resolve_unit(timestamp: i64) -> TimestampUnit {
    if timestamp < SECONDS_THRESHOLD {
        TimestampUnit::Seconds
    } else {
        TimestampUnit::Milliseconds
    }
}

pub fn to_millis(timestamp: i64) -> i64 {
    match resolve_unit(timestamp) {
        TimestampUnit::Seconds => timestamp.saturating_mul(1000),
        TimestampUnit::Milliseconds => timestamp,
    }
}

/// Renders `hh:mm am|pm` in India Standard Time; empty when the value is out
/// of chrono's range.
pub fn format_display_time(timestamp: i64) -> String {
    let Some(offset) = FixedOffset::east_opt(IST_OFFSET_SECS) else {
        return String::new();
    };
    match DateTime::from_timestamp_millis(to_millis(timestamp)) {
        Some(utc) => utc.with_timezone(&offset).format("%I:%M %P").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/time_tests.rs"]
mod tests;
