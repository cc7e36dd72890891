//! Relative timestamps.
//!
//! Records carry an integer timestamp counted from the store's creation
//! instant (its epoch) in units fixed when the store was created.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Resolution of stored timestamps, persisted as its decimal exponent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampPrecision {
    Seconds,
    #[default]
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimestampPrecision {
    pub fn exponent(self) -> u32 {
        match self {
            Self::Seconds => 0,
            Self::Milliseconds => 3,
            Self::Microseconds => 6,
            Self::Nanoseconds => 9,
        }
    }

    pub fn from_exponent(exponent: u32) -> Option<Self> {
        match exponent {
            0 => Some(Self::Seconds),
            3 => Some(Self::Milliseconds),
            6 => Some(Self::Microseconds),
            9 => Some(Self::Nanoseconds),
            _ => None,
        }
    }
}

/// The zero point and unit of a store's timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    epoch: DateTime<Utc>,
    precision: TimestampPrecision,
}

impl Clock {
    pub fn new(epoch: DateTime<Utc>, precision: TimestampPrecision) -> Self {
        Self { epoch, precision }
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn precision(&self) -> TimestampPrecision {
        self.precision
    }

    /// Timestamp of the current instant.
    pub fn now(&self) -> i64 {
        self.timestamp(Utc::now())
    }

    /// Timestamp of `at`, truncated to the clock's unit.
    ///
    /// Instants before the epoch map to 0.
    pub fn timestamp(&self, at: DateTime<Utc>) -> i64 {
        let delta = at.signed_duration_since(self.epoch);
        if delta <= TimeDelta::zero() {
            return 0;
        }
        match self.precision {
            TimestampPrecision::Seconds => delta.num_seconds(),
            TimestampPrecision::Milliseconds => delta.num_milliseconds(),
            TimestampPrecision::Microseconds => delta.num_microseconds().unwrap_or(i64::MAX),
            TimestampPrecision::Nanoseconds => delta.num_nanoseconds().unwrap_or(i64::MAX),
        }
    }

    /// Calendar time of a stored timestamp.
    pub fn datetime(&self, timestamp: i64) -> DateTime<Utc> {
        let delta = match self.precision {
            TimestampPrecision::Seconds => TimeDelta::try_seconds(timestamp),
            TimestampPrecision::Milliseconds => TimeDelta::try_milliseconds(timestamp),
            TimestampPrecision::Microseconds => Some(TimeDelta::microseconds(timestamp)),
            TimestampPrecision::Nanoseconds => Some(TimeDelta::nanoseconds(timestamp)),
        };
        delta
            .and_then(|d| self.epoch.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Inclusive timestamp bounds of a time range.
    pub fn bounds(&self, range: &TimeRange) -> (i64, i64) {
        let start = range.start.map_or(0, |t| self.timestamp(t));
        let end = range.end.map_or_else(|| self.now(), |t| self.timestamp(t));
        if start <= end {
            (start, end)
        } else {
            (end, start)
        }
    }
}

/// A filter on record timestamps.
///
/// A missing start means the epoch and a missing end means now. Bounds are
/// inclusive and swapped if given in reverse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_precision_exponent() {
        for p in [
            TimestampPrecision::Seconds,
            TimestampPrecision::Milliseconds,
            TimestampPrecision::Microseconds,
            TimestampPrecision::Nanoseconds,
        ] {
            assert_eq!(TimestampPrecision::from_exponent(p.exponent()), Some(p));
        }
        assert_eq!(TimestampPrecision::from_exponent(2), None);
        assert_eq!(TimestampPrecision::default(), TimestampPrecision::Milliseconds);
    }

    #[test]
    fn test_timestamp_truncates() {
        let at = epoch() + TimeDelta::milliseconds(1_999);
        let secs = Clock::new(epoch(), TimestampPrecision::Seconds);
        let millis = Clock::new(epoch(), TimestampPrecision::Milliseconds);
        let micros = Clock::new(epoch(), TimestampPrecision::Microseconds);
        assert_eq!(secs.timestamp(at), 1);
        assert_eq!(millis.timestamp(at), 1_999);
        assert_eq!(micros.timestamp(at), 1_999_000);
    }

    #[test]
    fn test_before_epoch_is_zero() {
        let clock = Clock::new(epoch(), TimestampPrecision::Milliseconds);
        assert_eq!(clock.timestamp(epoch() - TimeDelta::seconds(5)), 0);
    }

    #[test]
    fn test_datetime_inverse() {
        let clock = Clock::new(epoch(), TimestampPrecision::Milliseconds);
        let at = epoch() + TimeDelta::milliseconds(123_456);
        assert_eq!(clock.datetime(clock.timestamp(at)), at);
    }

    #[test]
    fn test_bounds_default_and_swap() {
        let clock = Clock::new(epoch(), TimestampPrecision::Seconds);
        let a = epoch() + TimeDelta::seconds(10);
        let b = epoch() + TimeDelta::seconds(20);
        assert_eq!(clock.bounds(&TimeRange::new(b, a)), (10, 20));
        assert_eq!(clock.bounds(&TimeRange::until(a)), (0, 10));

        let (start, end) = clock.bounds(&TimeRange::default());
        assert_eq!(start, 0);
        assert!(end > 0);
    }
}
