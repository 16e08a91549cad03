//! Schedule quality metrics (KPIs).
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Last end minus first start |
//! | Last end | Latest completion on the tournament axis |
//! | Min rest | Smallest gap between consecutive matches of one team |
//! | Near-consecutive | Pairs of one team's matches starting closer than the threshold |
//! | Utilization | Busy minutes per court over the makespan |
//!
//! The optimizer ranks solutions by [`ObjectiveKey`], which orders the first
//! three quantities lexicographically.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Schedule;

/// Lexicographic objective: earlier last end, then longer minimum rest, then
/// fewer near-consecutive pairs. Smaller is better.
///
/// Every component only worsens as placements are added, so the key of a
/// partial schedule bounds the key of any completion of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectiveKey {
    /// Latest end (minutes).
    pub last_end: i64,
    /// Negated minimum rest gap; `i64::MIN` while no team plays twice.
    pub rest_deficit: i64,
    /// Near-consecutive pair count.
    pub penalty: u32,
}

impl ObjectiveKey {
    /// Key of the empty schedule starting at `opening`.
    pub fn empty(opening: i64) -> Self {
        Self {
            last_end: opening,
            rest_deficit: i64::MIN,
            penalty: 0,
        }
    }

    /// Minimum rest gap, if any team plays twice.
    pub fn min_rest(&self) -> Option<i64> {
        (self.rest_deficit != i64::MIN).then(|| -self.rest_deficit)
    }

    /// Key after adding one placement.
    pub fn extend(&self, end: i64, rest: Option<i64>, penalty: u32) -> Self {
        Self {
            last_end: self.last_end.max(end),
            rest_deficit: match rest {
                Some(gap) => self.rest_deficit.max(-gap),
                None => self.rest_deficit,
            },
            penalty: self.penalty.saturating_add(penalty),
        }
    }
}

/// Schedule performance indicators.
///
/// All time values are in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// First start to last end.
    pub makespan: i64,
    /// Latest end, if anything is scheduled.
    pub last_end: Option<i64>,
    /// Smallest rest gap of any team.
    pub min_rest: Option<i64>,
    /// Near-consecutive pairs across all teams.
    pub near_consecutive: u32,
    /// Average court utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-court utilization.
    pub utilization_by_court: HashMap<String, f64>,
    /// Placed matches.
    pub scheduled: usize,
    /// Matches left off the courts.
    pub unscheduled: usize,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule.
    ///
    /// `near_threshold` is the start-to-start distance below which two
    /// matches of a team count as near-consecutive.
    pub fn calculate(schedule: &Schedule, near_threshold: i64) -> Self {
        let mut by_team: HashMap<&str, Vec<(i64, i64)>> = HashMap::new();
        for a in &schedule.assignments {
            for team in &a.teams {
                by_team.entry(team.as_str()).or_default().push((a.start, a.end));
            }
        }

        let mut min_rest: Option<i64> = None;
        let mut near_consecutive: u32 = 0;
        for games in by_team.values_mut() {
            games.sort_unstable();
            for pair in games.windows(2) {
                let gap = pair[1].0 - pair[0].1;
                min_rest = Some(min_rest.map_or(gap, |m| m.min(gap)));
            }
            for (i, a) in games.iter().enumerate() {
                near_consecutive += games[i + 1..]
                    .iter()
                    .filter(|b| (b.0 - a.0).abs() < near_threshold)
                    .count() as u32;
            }
        }

        let utilization_by_court = schedule.court_utilization();
        let avg_utilization = if utilization_by_court.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_court.values().sum();
            sum / utilization_by_court.len() as f64
        };

        Self {
            makespan: schedule.makespan(),
            last_end: schedule.last_end(),
            min_rest,
            near_consecutive,
            avg_utilization,
            utilization_by_court,
            scheduled: schedule.assignment_count(),
            unscheduled: schedule.unscheduled.len(),
        }
    }

    /// Objective key of the schedule, for comparing strategies.
    pub fn objective(&self) -> ObjectiveKey {
        ObjectiveKey {
            last_end: self.last_end.unwrap_or(0),
            rest_deficit: self.min_rest.map_or(i64::MIN, |r| -r),
            penalty: self.near_consecutive,
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_rest: i64, max_near_consecutive: u32) -> bool {
        self.min_rest.is_none_or(|r| r >= min_rest) && self.near_consecutive <= max_near_consecutive
    }
}
