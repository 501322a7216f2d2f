//! Date normalization.
//!
//! The provider encodes dates three different ways and this module folds all
//! of them into UTC epoch seconds:
//! - all-day events carry a bare date, interpreted as midnight in the
//!   calendar's configured timezone;
//! - timed events carry a full instant with an embedded offset;
//! - created/updated stamps carry 3-digit fractional seconds
//!   ("2010-01-09T16:06:35.311Z"), which is a perfectly valid instant but
//!   not what a strict RFC 3339 parser expects, so they get an explicit
//!   fractional-seconds-aware format. Unparsable stamps (or stamps with a
//!   year at or before 1970, i.e. garbage) normalize to the sentinel `0`,
//!   which callers treat as "unknown".

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::event::RemoteEventTime;

const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%#z";
const EPOCH_YEAR: i32 = 1970;

/// Convert an all-day date to the UTC epoch of midnight in `tz`.
pub fn all_day_to_epoch(date: NaiveDate, tz: Tz) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc).timestamp(),
        None => {
            // Midnight falls inside a DST gap (some zones spring forward at
            // 00:00); the day effectively starts when the clocks land.
            let shifted = midnight + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|local| local.with_timezone(&Utc).timestamp())
                .unwrap_or_else(|| midnight.and_utc().timestamp())
        }
    }
}

/// Parse a full instant with embedded offset to a UTC epoch.
pub fn instant_to_epoch(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|instant| instant.timestamp())
}

/// Parse a created/updated stamp with 3-digit fractional seconds.
///
/// Returns `0` on parse failure or when the parsed year is at or before the
/// epoch year. Event start/end dates are not stored with sub-second
/// accuracy and so never take this path.
pub fn stamp_to_epoch(value: &str) -> i64 {
    match DateTime::parse_from_str(value, STAMP_FORMAT) {
        Ok(stamp) if stamp.year() > EPOCH_YEAR => stamp.timestamp(),
        _ => 0,
    }
}

/// Normalize a remote start/end to a UTC epoch.
///
/// The `date` value is set only when the event has no time component, so
/// check it first; otherwise parse the full instant from `dateTime`.
/// `None` means the record carried neither encoding, or an unparsable one.
pub fn event_time_to_epoch(time: &RemoteEventTime, tz: Tz) -> Option<i64> {
    match (time.date, time.date_time.as_deref()) {
        (Some(date), _) => Some(all_day_to_epoch(date, tz)),
        (None, Some(instant)) => instant_to_epoch(instant),
        (None, None) => None,
    }
}
