//! Time/slot model.
//!
//! Discretizes each court's per-day window into start slots spaced by the
//! slot granularity. Slot `k` of a court-day starts at `opens + k * granularity`
//! and exists while it starts before the court closes; whether a match of a
//! given length *fits* at a slot is decided later against the window end.
//!
//! A court-day whose resolved length is not positive, or any court when the
//! granularity is not positive, yields a [`ConfigurationError`]. Such
//! court-days are excluded from the grid; the rest of the grid is unaffected.

use log::warn;

use crate::error::ConfigurationError;
use crate::models::{Court, CourtDay, TimeWindow};

/// Slots of one court on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct CourtDaySlots {
    /// Court name.
    pub court: String,
    /// Position of the court in the input list.
    pub court_index: usize,
    /// Tournament day.
    pub day: u32,
    /// Availability window on the tournament axis.
    pub window: TimeWindow,
    /// Slot start minutes, ascending.
    pub starts: Vec<i64>,
}

/// Slots for every usable court-day.
#[derive(Debug, Clone, Default)]
pub struct SlotGrid {
    /// Usable court-days, in court then day order.
    pub court_days: Vec<CourtDaySlots>,
    /// Court-days left out, with the reason.
    pub excluded: Vec<ConfigurationError>,
    /// Granularity used (minutes).
    pub granularity: i64,
}

/// Computes the window and slot starts of one court-day.
pub fn court_day_slots(
    court: &str,
    day: &CourtDay,
    granularity: i64,
) -> Result<(TimeWindow, Vec<i64>), ConfigurationError> {
    if granularity <= 0 {
        return Err(ConfigurationError::InvalidGranularity(granularity));
    }
    let length_min = day.length_min();
    if length_min <= 0 {
        return Err(ConfigurationError::EmptyCourtDay {
            court: court.to_string(),
            day: day.day,
            length_min,
        });
    }

    let window = day.window();
    let starts = (0..)
        .map(|k| window.start + k * granularity)
        .take_while(|&start| start < window.end)
        .collect();
    Ok((window, starts))
}

impl SlotGrid {
    /// Builds the grid for all courts.
    pub fn build(courts: &[Court], granularity: i64) -> Self {
        let mut grid = Self {
            granularity,
            ..Self::default()
        };

        if granularity <= 0 {
            warn!("slot granularity {granularity} min is not positive, no court is usable");
            grid.excluded
                .push(ConfigurationError::InvalidGranularity(granularity));
            return grid;
        }

        for (court_index, court) in courts.iter().enumerate() {
            let mut days: Vec<&CourtDay> = court.days.iter().collect();
            days.sort_by_key(|d| d.day);

            for day in days {
                match court_day_slots(&court.name, day, granularity) {
                    Ok((window, starts)) => grid.court_days.push(CourtDaySlots {
                        court: court.name.clone(),
                        court_index,
                        day: day.day,
                        window,
                        starts,
                    }),
                    Err(e) => {
                        warn!("excluding court-day: {e}");
                        grid.excluded.push(e);
                    }
                }
            }
        }

        grid
    }

    /// Total number of slots across court-days.
    pub fn slot_count(&self) -> usize {
        self.court_days.iter().map(|cd| cd.starts.len()).sum()
    }

    /// Earliest opening across all usable court-days.
    pub fn opening(&self) -> Option<i64> {
        self.court_days.iter().map(|cd| cd.window.start).min()
    }

    /// Whether no court-day is usable.
    pub fn is_empty(&self) -> bool {
        self.court_days.is_empty()
    }
}
