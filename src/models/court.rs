//! Court model.
//!
//! A court is the only resource a match occupies. Each court declares, per
//! tournament day, the clock time it opens and the clock time it closes.
//! A closing time at or before the opening time means the window runs past
//! midnight into the next calendar day.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::calendar::{self, TimeWindow, MINUTES_PER_DAY};

/// A court that can host matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    /// Unique court name.
    pub name: String,
    /// Availability per tournament day.
    pub days: Vec<CourtDay>,
}

/// One day of court availability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourtDay {
    /// Tournament day (0-indexed).
    pub day: u32,
    /// Opening clock time.
    pub opens: NaiveTime,
    /// Closing clock time (may wrap past midnight).
    pub closes: NaiveTime,
}

impl Court {
    /// Creates a court with no availability.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            days: Vec::new(),
        }
    }

    /// Creates a court open with the same hours on days `0..days`.
    pub fn daily(name: impl Into<String>, days: u32, opens: NaiveTime, closes: NaiveTime) -> Self {
        let mut court = Self::new(name);
        for day in 0..days {
            court.days.push(CourtDay::new(day, opens, closes));
        }
        court
    }

    /// Adds a day of availability.
    pub fn with_day(mut self, day: u32, opens: NaiveTime, closes: NaiveTime) -> Self {
        self.days.push(CourtDay::new(day, opens, closes));
        self
    }

    /// Availability declared for `day`, if any.
    pub fn day(&self, day: u32) -> Option<&CourtDay> {
        self.days.iter().find(|d| d.day == day)
    }
}

impl CourtDay {
    /// Creates a day window.
    pub fn new(day: u32, opens: NaiveTime, closes: NaiveTime) -> Self {
        Self { day, opens, closes }
    }

    /// Whether the window runs past midnight.
    pub fn wraps(&self) -> bool {
        self.closes <= self.opens
    }

    /// Resolved window length in minutes, after midnight wrap.
    ///
    /// Equal opening and closing times resolve to zero.
    pub fn length_min(&self) -> i64 {
        let diff = calendar::minute_of_day(self.closes) - calendar::minute_of_day(self.opens);
        if diff < 0 {
            diff + MINUTES_PER_DAY
        } else {
            diff
        }
    }

    /// The window on the tournament axis.
    pub fn window(&self) -> TimeWindow {
        let start = calendar::at(self.day, self.opens);
        TimeWindow::new(start, start + self.length_min())
    }
}
