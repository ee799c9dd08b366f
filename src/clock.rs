use chrono::{Local, NaiveDateTime, Timelike};

/// Layout of `created_at` and `updated_at` in the database. Sorts chronologically as text
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of note timestamps
pub trait Clock {
    /// Current local time, truncated to whole seconds
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        truncate_to_seconds(Local::now().naive_local())
    }
}

/// Drops sub-second precision
#[must_use]
pub fn truncate_to_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[must_use]
pub fn format_timestamp(time: NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp
///
/// # Errors
///
/// Returns a `chrono` parse error if `s` is not in `TIMESTAMP_FORMAT`
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}
