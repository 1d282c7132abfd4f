//! Operation Clock
//!
//! Nanosecond time alias and conversion constants for the wager core.
//! The core never reads system time: every state-changing operation receives
//! its decision time as an explicit `now: Nanos` argument, read once at the
//! service edge. This keeps placement/resolution deterministic and testable
//! without a mock clock.

use chrono::Utc;

/// Nanoseconds since Unix epoch (1970-01-01 00:00:00 UTC).
/// i64 gives us ~292 years of range.
pub type Nanos = i64;

/// Conversion constants
pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SEC: i64 = 1_000_000_000;
pub const NANOS_PER_MIN: i64 = 60 * NANOS_PER_SEC;

/// Convert whole seconds to nanoseconds.
#[inline]
pub fn secs(s: i64) -> Nanos {
    s * NANOS_PER_SEC
}

/// Wall-clock read for the service edge. Core modules must take `now` as a
/// parameter instead of calling this.
#[inline]
pub fn unix_nanos_now() -> Nanos {
    Utc::now()
        .timestamp_nanos_opt()
        .expect("wall clock out of nanosecond range")
}
