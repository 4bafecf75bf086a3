//! Timestamp type on a common nanosecond timeline.

use crate::format::Rational;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A point on the common timeline, in signed nanoseconds.
///
/// Each stream stamps its frames in its own time base; rescaling both to
/// nanoseconds is what makes them comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp {
    nanos: i64,
}

impl Timestamp {
    /// Create a timestamp from nanoseconds.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self::from_nanos(millis * 1_000_000)
    }

    /// Rescale a presentation timestamp from its stream time base.
    pub fn from_pts(pts: i64, time_base: Rational) -> Self {
        Self::from_nanos(time_base.to_nanos(pts))
    }

    /// Get the raw nanoseconds value.
    pub const fn as_nanos(&self) -> i64 {
        self.nanos
    }

    /// Calculate the absolute difference between two timestamps.
    pub fn abs_diff(&self, other: &Self) -> Duration {
        Duration::from_nanos(self.nanos.abs_diff(other.nanos))
    }

    /// Check if this timestamp is within a tolerance of another.
    pub fn within_tolerance(&self, other: &Self, tolerance: Duration) -> bool {
        self.abs_diff(other) <= tolerance
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let delta = i64::try_from(rhs.as_nanos()).unwrap_or(i64::MAX);
        Self::from_nanos(self.nanos.saturating_add(delta))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        let delta = i64::try_from(rhs.as_nanos()).unwrap_or(i64::MAX);
        Self::from_nanos(self.nanos.saturating_sub(delta))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.nanos < 0 { "-" } else { "" };
        let abs = self.nanos.unsigned_abs();
        write!(f, "{}{}.{:09}s", sign, abs / 1_000_000_000, abs % 1_000_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pts_rescales() {
        let a = Timestamp::from_pts(3, Rational::new(1, 25));
        let b = Timestamp::from_pts(10_800, Rational::MPEG);
        assert_eq!(a, Timestamp::from_millis(120));
        assert_eq!(a, b);
    }

    #[test]
    fn test_abs_diff_and_tolerance() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(95);
        assert_eq!(a.abs_diff(&b), Duration::from_millis(5));
        assert!(a.within_tolerance(&b, Duration::from_millis(5)));
        assert!(!a.within_tolerance(&b, Duration::from_millis(4)));
    }

    #[test]
    fn test_arithmetic_saturates() {
        let ts = Timestamp::from_nanos(i64::MAX - 1);
        assert_eq!((ts + Duration::from_secs(1)).as_nanos(), i64::MAX);
        let ts = Timestamp::from_nanos(i64::MIN + 1);
        assert_eq!((ts - Duration::from_secs(1)).as_nanos(), i64::MIN);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::from_millis(1500).to_string(), "1.500000000s");
        assert_eq!(Timestamp::from_millis(-40).to_string(), "-0.040000000s");
    }
}
