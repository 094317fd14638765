//! Hour-bucket arithmetic shared by every rate-limit store.
//!
//! Usage is counted in wall-clock hour buckets and summed over a trailing
//! window of bucket starts. This is an approximation: a bucket counts in
//! full as long as its start lies inside the window, so two requests a few
//! minutes apart across an hour boundary land in different buckets while
//! two requests 58 minutes apart inside one hour share a bucket.

use chrono::{DateTime, TimeDelta, Timelike, Utc};

/// Start of the hour bucket containing `now`.
pub fn bucket_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let into_hour = TimeDelta::seconds(i64::from(now.minute() * 60 + now.second()))
        + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    now - into_hour
}

/// Earliest bucket start still counted by `current_usage(.., period_hours)`.
///
/// Buckets with `period_start >= usage_window_start(now, period_hours)` count.
pub fn usage_window_start(now: DateTime<Utc>, period_hours: u32) -> DateTime<Utc> {
    now - TimeDelta::hours(i64::from(period_hours))
}

/// Buckets with `period_start` strictly before this instant are purged.
pub fn retention_cutoff(now: DateTime<Utc>, retention_hours: u32) -> DateTime<Utc> {
    now - TimeDelta::hours(i64::from(retention_hours))
}
