//! Time windows and the tournament time axis.
//!
//! # Time Model
//! All times are whole minutes on a single tournament-wide axis:
//! `day * 1440 + minute_of_day`. A court window that closes after midnight
//! simply extends past the end of its day on this axis, so intervals on
//! consecutive days compare correctly without special cases.
//!
//! Clock times (`NaiveTime`) only appear at the boundary, when courts and
//! team rules are declared and when assignments are rendered.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Minutes in one tournament day.
pub const MINUTES_PER_DAY: i64 = 1440;

/// A time interval [start, end) on the tournament axis.
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Interval start (minutes, inclusive).
    pub start: i64,
    /// Interval end (minutes, exclusive).
    pub end: i64,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Duration of this window (minutes).
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether a minute falls within this window.
    #[inline]
    pub fn contains(&self, minute: i64) -> bool {
        minute >= self.start && minute < self.end
    }

    /// Whether `other` lies entirely inside this window.
    pub fn encloses(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Gap between the end of the earlier window and the start of the later one.
    ///
    /// Negative when the windows overlap.
    pub fn gap_to(&self, other: &Self) -> i64 {
        if self.start <= other.start {
            other.start - self.end
        } else {
            self.start - other.end
        }
    }
}

/// Minute of the day for a clock time (seconds are truncated).
#[inline]
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

/// Absolute minute on the tournament axis for `time` on `day`.
#[inline]
pub fn at(day: u32, time: NaiveTime) -> i64 {
    i64::from(day) * MINUTES_PER_DAY + minute_of_day(time)
}

/// Splits an absolute minute into its day and clock time.
///
/// Minutes past midnight of a wrapping window land on the following day.
pub fn to_clock(minute: i64) -> (u32, NaiveTime) {
    let day = minute.div_euclid(MINUTES_PER_DAY);
    let rem = minute.rem_euclid(MINUTES_PER_DAY);
    let time = NaiveTime::from_num_seconds_from_midnight_opt((rem * 60) as u32, 0)
        .unwrap_or(NaiveTime::MIN);
    (day.max(0) as u32, time)
}
