//! Void-time clock
//!
//! Void times are seconds since 2010-01-01 00:00:00 UTC, stored as `u32`.
//! A void time of 0 means the record never expires.
//!
//! Conflict resolution never reads the clock; only expiry checks do.

use chrono::{DateTime, TimeZone, Utc};

/// Unix time of the void-time epoch (2010-01-01 00:00:00 UTC)
pub const VOID_TIME_EPOCH_UNIX_SECS: i64 = 1_262_304_000;

/// Current time expressed as a void time
pub fn now_void_time() -> u32 {
    to_void_time(Utc::now())
}

/// Convert a wall-clock instant to a void time, clamped to the `u32` range
pub fn to_void_time(at: DateTime<Utc>) -> u32 {
    let secs = at.timestamp() - VOID_TIME_EPOCH_UNIX_SECS;
    secs.clamp(0, i64::from(u32::MAX)) as u32
}

/// Convert a void time back to a wall-clock instant
///
/// Returns `None` for 0, which means "never expires".
pub fn from_void_time(void_time: u32) -> Option<DateTime<Utc>> {
    if void_time == 0 {
        return None;
    }
    Utc.timestamp_opt(VOID_TIME_EPOCH_UNIX_SECS + i64::from(void_time), 0)
        .single()
}
