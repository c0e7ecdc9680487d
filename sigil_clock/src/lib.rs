//! Clocks for token time checks
//!
//! JWT timestamps are expressed in whole seconds, but comparisons against
//! the current time are made at millisecond resolution. The types here
//! expose both views and allow a clock to be pinned in tests.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_must_use
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{convert::TryFrom, time::SystemTime};

/// Unix time
///
/// Unix time as represented by the number of seconds elapsed since the
/// beginning of the Unix epoch on 1970/01/01 at 00:00:00 UTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

/// Unix time in milliseconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UnixMillis(pub u64);

impl UnixMillis {
    /// Truncates to whole seconds
    #[inline]
    pub const fn to_seconds(self) -> UnixTime {
        UnixTime(self.0 / 1000)
    }
}

impl From<UnixTime> for UnixMillis {
    #[inline]
    fn from(t: UnixTime) -> Self {
        Self(t.0.saturating_mul(1000))
    }
}

impl From<SystemTime> for UnixMillis {
    #[inline]
    fn from(t: SystemTime) -> Self {
        // Times before the epoch clamp to zero
        let millis = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

impl From<SystemTime> for UnixTime {
    #[inline]
    fn from(t: SystemTime) -> Self {
        UnixMillis::from(t).to_seconds()
    }
}

/// Represents a clock, which can tell the current time
pub trait Clock {
    /// Gets the current time according to this clock, in milliseconds
    fn now_millis(&self) -> UnixMillis;

    /// Gets the current time according to this clock, in whole seconds
    #[inline]
    fn now(&self) -> UnixTime {
        self.now_millis().to_seconds()
    }
}

impl<C: Clock + ?Sized> Clock for &'_ C {
    #[inline]
    fn now_millis(&self) -> UnixMillis {
        (**self).now_millis()
    }
}

/// The system clock as provided by `std::time::SystemTime`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now_millis(&self) -> UnixMillis {
        UnixMillis::from(SystemTime::now())
    }
}

/// A test clock which maintains the current time as internal state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestClock(UnixMillis);

impl Clock for TestClock {
    #[inline]
    fn now_millis(&self) -> UnixMillis {
        self.0
    }
}

impl TestClock {
    /// Creates a new test clock pinned to the start of the specified second
    #[inline]
    pub const fn new(time: UnixTime) -> Self {
        Self(UnixMillis(time.0.saturating_mul(1000)))
    }

    /// Creates a new test clock with millisecond precision
    #[inline]
    pub const fn with_millis(time: UnixMillis) -> Self {
        Self(time)
    }

    /// Updates the clock's current time to `val`
    pub fn set(&mut self, val: UnixTime) {
        self.0 = UnixMillis::from(val);
    }

    /// Increments the clock's current time by `inc` seconds
    pub fn inc(&mut self, inc: u64) {
        self.inc_millis(inc.saturating_mul(1000));
    }

    /// Increments the clock's current time by `inc` milliseconds
    pub fn inc_millis(&mut self, inc: u64) {
        (self.0).0 = (self.0).0.saturating_add(inc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_keeps_sub_second_precision() {
        let mut clock = TestClock::new(UnixTime(10));
        clock.inc_millis(999);

        assert_eq!(clock.now_millis(), UnixMillis(10_999));
        assert_eq!(clock.now(), UnixTime(10));

        clock.inc_millis(1);
        assert_eq!(clock.now(), UnixTime(11));
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(System.now_millis() > UnixMillis(0));
    }

    #[test]
    fn test_clock_saturates_at_the_end_of_time() {
        let mut clock = TestClock::new(UnixTime(u64::MAX));
        assert_eq!(clock.now_millis(), UnixMillis(u64::MAX));

        let mut near_end = TestClock::with_millis(UnixMillis(u64::MAX - 1));
        near_end.inc_millis(5);
        assert_eq!(near_end.now_millis(), UnixMillis(u64::MAX));

        clock.inc(1);
        assert_eq!(clock.now_millis(), UnixMillis(u64::MAX));
    }

    #[test]
    fn set_replaces_millis() {
        let mut clock = TestClock::with_millis(UnixMillis(1_500));
        clock.set(UnixTime(3));
        assert_eq!(clock.now_millis(), UnixMillis(3_000));
    }
}
