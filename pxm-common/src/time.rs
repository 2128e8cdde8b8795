//! Timestamp utilities
//!
//! Photo check timestamps are stored as unix seconds so staleness filters
//! compare plain integers in SQL.

use chrono::Utc;
use std::time::Duration;

/// Current time as unix seconds
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Unix seconds `delay` before `reference`
pub fn unix_before(reference: i64, delay: Duration) -> i64 {
    let delay = i64::try_from(delay.as_secs()).unwrap_or(i64::MAX);
    reference.saturating_sub(delay)
}
