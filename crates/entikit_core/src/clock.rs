//! Time sources.
//!
//! The entity layer never calls the system clock directly: TTL expiry and
//! "today" comparisons go through a [`Clock`] handed in at construction.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::time::Duration;

/// A source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current calendar date used for day-granular comparisons.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The operating system clock; `today` follows the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to.
///
/// # Example
///
/// ```rust
/// use entikit_core::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::at_date(2024, 3, 1).unwrap();
/// clock.advance(Duration::from_secs(86_400));
/// assert_eq!(clock.today().to_string(), "2024-03-02");
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Creates a clock frozen at midnight UTC of the given date.
    ///
    /// Returns `None` if the date is not a valid calendar date.
    #[must_use]
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self::new(date.and_time(NaiveTime::MIN).and_utc()))
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let step = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.write();
        *now = now.checked_add_signed(step).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_frozen() {
        let clock = ManualClock::at_date(2024, 1, 31).unwrap();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn manual_clock_advances_across_days() {
        let clock = ManualClock::at_date(2024, 1, 31).unwrap();
        clock.advance(Duration::from_secs(86_400 + 1));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn invalid_date_has_no_clock() {
        assert!(ManualClock::at_date(2023, 2, 29).is_none());
        assert!(ManualClock::at_date(2024, 13, 1).is_none());
        assert!(ManualClock::at_date(2024, 2, 29).is_some());
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
