//! Calendar-day keys and the clock that produces them.
//!
//! Every comparison between check-ins and "today" goes through [`DateKey`],
//! a plain calendar date in the user's local timezone. Day differences are
//! computed on dates, never on timestamps, so DST shifts and UTC offsets
//! cannot move a check-in into the neighbouring day.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a key from year/month/day, returning `None` for impossible dates.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse a `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        NaiveDate::parse_from_str(s.trim(), DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|e| ValidationError::InvalidValue {
                field: "date",
                message: format!("'{s}' is not a YYYY-MM-DD date: {e}"),
            })
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Shift by `days`, saturating at the ends of the supported calendar.
    pub fn add_days(self, days: i64) -> Self {
        let shifted = Duration::try_days(days).and_then(|d| self.0.checked_add_signed(d));
        match shifted {
            Some(date) => Self(date),
            None if days < 0 => Self(NaiveDate::MIN),
            None => Self(NaiveDate::MAX),
        }
    }

    /// The day before.
    pub fn pred(self) -> Self {
        self.add_days(-1)
    }

    /// The day after.
    pub fn succ(self) -> Self {
        self.add_days(1)
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// Day of the month, starting at 1.
    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// Most recent day (inclusive) that falls on `first_weekday`.
    pub fn start_of_week(self, first_weekday: Weekday) -> Self {
        let back = (7 + self.weekday().num_days_from_monday()
            - first_weekday.num_days_from_monday())
            % 7;
        self.add_days(-i64::from(back))
    }

    /// Signed number of calendar days from `self` to `later`.
    pub fn days_until(self, later: DateKey) -> i64 {
        (later.0 - self.0).num_days()
    }
}

/// Signed day difference `b - a`.
///
/// `days_between(yesterday, today) == 1`, `days_between(today, yesterday) == -1`.
pub fn days_between(a: DateKey, b: DateKey) -> i64 {
    a.days_until(b)
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Source of "now" and of the local calendar day.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day of [`Clock::now`] in the caller's timezone.
    fn today(&self) -> DateKey;
}

/// Wall clock. Uses the machine's local timezone unless a fixed offset is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn local() -> Self {
        Self { offset: None }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    /// Offset in minutes east of UTC; out-of-range values fall back to local time.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        match minutes
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
        {
            Some(offset) => Self::with_offset(offset),
            None => Self::local(),
        }
    }

    fn day_of(&self, instant: DateTime<Utc>) -> DateKey {
        match self.offset {
            Some(offset) => DateKey(instant.with_timezone(&offset).date_naive()),
            None => DateKey(instant.with_timezone(&Local).date_naive()),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> DateKey {
        self.day_of(Utc::now())
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
    today: Cell<DateKey>,
}

impl FixedClock {
    pub fn new(today: DateKey) -> Self {
        Self {
            today: Cell::new(today),
        }
    }

    /// Panics on an impossible date; meant for literals in tests.
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self::new(DateKey::from_ymd(year, month, day).expect("valid calendar date"))
    }

    pub fn set_today(&self, today: DateKey) {
        self.today.set(today);
    }

    pub fn advance_days(&self, days: i64) {
        self.today.set(self.today.get().add_days(days));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        // Noon keeps the instant on the same calendar day for any offset within +-12h.
        self.today
            .get()
            .date()
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now)
    }

    fn today(&self) -> DateKey {
        self.today.get()
    }
}
