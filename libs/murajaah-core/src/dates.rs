//! Calendar-day helpers.
//!
//! Every schedule boundary is a UTC calendar day. Next-review times land on
//! 00:00:00 of their day so that "due today" is a plain comparison with `now`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// 00:00:00 UTC of the day containing `t`.
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Start of the day `days` calendar days after `t`.
pub fn days_later_at_midnight(t: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    midnight_after(t, Duration::try_days(days).unwrap_or(Duration::MAX))
}

/// Start of the day `interval` after `t`. Saturates at the last
/// representable day instead of overflowing.
pub fn midnight_after(t: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    t.checked_add_signed(interval)
        .map_or(start_of_day(DateTime::<Utc>::MAX_UTC), start_of_day)
}

/// Snapshot date of the daily task list generated at `now`.
pub fn task_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Whole days elapsed between `from` and `to`, truncated toward zero.
pub fn whole_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    to.signed_duration_since(from).num_hours() / 24
}

/// Fractional days elapsed since `from`, never negative.
pub fn elapsed_days(from: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = now.signed_duration_since(from).num_seconds() as f64;
    (secs / 86_400.0).max(0.0)
}
