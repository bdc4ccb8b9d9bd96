//! Shared session and calendar arithmetic.
//!
//! All calendar computations are UTC-based for determinism. Durations are
//! clamped rather than allowed to go negative: a close that predates its own
//! start (clock anomaly, very short-lived session) yields a zero-length
//! session, never a negative one.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// Converts milliseconds since the epoch to whole seconds.
#[must_use]
pub const fn millis_to_secs(millis: u64) -> u64 {
    millis / 1000
}

/// Converts seconds since the epoch to milliseconds.
#[must_use]
pub const fn secs_to_millis(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}

/// Returns `end - start` in the same unit, clamped at zero.
#[must_use]
pub const fn elapsed(start: u64, end: u64) -> u64 {
    end.saturating_sub(start)
}

fn datetime_from_secs(secs: u64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(i64::try_from(secs).ok()?, 0).single()
}

fn datetime_from_millis(millis: u64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(i64::try_from(millis).ok()?).single()
}

/// Returns the number of calendar days between two epoch-second timestamps.
///
/// Counts UTC date boundaries, not 24-hour blocks: 23:59 to 00:01 the next
/// day is one day. Returns 0 when either timestamp is unrepresentable or
/// `end` precedes `start`.
#[must_use]
pub fn days_between(start_secs: u64, end_secs: u64) -> u64 {
    let (Some(start), Some(end)) = (datetime_from_secs(start_secs), datetime_from_secs(end_secs))
    else {
        return 0;
    };
    let days = (end.date_naive() - start.date_naive()).num_days();
    u64::try_from(days).unwrap_or(0)
}

/// Returns whether two epoch-second timestamps fall on the same UTC day.
#[must_use]
pub fn same_calendar_day(a_secs: u64, b_secs: u64) -> bool {
    match (datetime_from_secs(a_secs), datetime_from_secs(b_secs)) {
        (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
        _ => false,
    }
}

/// Returns whether two epoch-second timestamps fall in the same UTC month.
#[must_use]
pub fn same_calendar_month(a_secs: u64, b_secs: u64) -> bool {
    match (datetime_from_secs(a_secs), datetime_from_secs(b_secs)) {
        (Some(a), Some(b)) => a.year() == b.year() && a.month() == b.month(),
        _ => false,
    }
}

/// Returns the hour of day (0-23) of an epoch-second timestamp.
#[must_use]
pub fn hour_of_day(secs: u64) -> u32 {
    datetime_from_secs(secs).map_or(0, |dt| dt.hour())
}

/// Returns the day of week (1 = Sunday .. 7 = Saturday) of an epoch-second
/// timestamp.
#[must_use]
pub fn day_of_week(secs: u64) -> u32 {
    datetime_from_secs(secs).map_or(1, |dt| dt.weekday().num_days_from_sunday() + 1)
}

/// Formats an epoch-millisecond timestamp as ISO-8601 at millisecond
/// precision, e.g. `"2026-08-29T10:04:02.123Z"`.
#[must_use]
pub fn iso8601_millis(millis: u64) -> String {
    datetime_from_millis(millis)
        .map_or_else(String::new, |dt| {
            dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
        })
}

/// Formats an epoch-second timestamp as a short date, e.g. `"8/29/2026"`.
#[must_use]
pub fn short_date(secs: u64) -> String {
    datetime_from_secs(secs)
        .map_or_else(String::new, |dt| dt.format("%-m/%-d/%Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-08-29T10:04:02.123Z
    const TS_MS: u64 = 1_787_997_842_123;
    const TS_S: u64 = TS_MS / 1000;

    #[test]
    fn test_unit_conversions() {
        assert_eq!(millis_to_secs(1999), 1);
        assert_eq!(secs_to_millis(2), 2000);
    }

    #[test]
    fn test_elapsed_clamps_at_zero() {
        assert_eq!(elapsed(10, 15), 5);
        assert_eq!(elapsed(15, 10), 0);
    }

    #[test]
    fn test_days_between_counts_date_boundaries() {
        // One second before midnight to one second after is one day.
        let before_midnight = TS_S - (10 * 3600 + 4 * 60 + 2) - 1;
        let after_midnight = before_midnight + 2;
        assert_eq!(days_between(before_midnight, after_midnight), 1);
        assert_eq!(days_between(TS_S, TS_S + 86_400 * 3), 3);
        assert_eq!(days_between(TS_S, TS_S), 0);
    }

    #[test]
    fn test_days_between_reversed_is_zero() {
        assert_eq!(days_between(TS_S + 86_400, TS_S), 0);
    }

    #[test]
    fn test_same_calendar_day_and_month() {
        assert!(same_calendar_day(TS_S, TS_S + 60));
        assert!(!same_calendar_day(TS_S, TS_S + 86_400));
        assert!(same_calendar_month(TS_S, TS_S + 86_400));
        assert!(!same_calendar_month(TS_S, TS_S + 86_400 * 31));
    }

    #[test]
    fn test_hour_and_day_of_week() {
        assert_eq!(hour_of_day(TS_S), 10);
        // 2026-08-29 is a Saturday.
        assert_eq!(day_of_week(TS_S), 7);
    }

    #[test]
    fn test_iso8601_millis() {
        assert_eq!(iso8601_millis(TS_MS), "2026-08-29T10:04:02.123Z");
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date(TS_S), "8/29/2026");
    }
}
