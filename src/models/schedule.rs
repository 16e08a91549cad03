//! Schedule (solution) model.
//!
//! A schedule maps every input match either to an assignment (court, day,
//! slot, time interval) or to the hard constraint that kept it off the
//! courts. Schedules are produced fresh by every scheduling run.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::calendar::{self, TimeWindow};
use super::MatchId;

/// A complete scheduling outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Placed matches.
    pub assignments: Vec<Assignment>,
    /// Matches that could not be placed.
    pub unscheduled: Vec<Unscheduled>,
}

/// A match placed on a court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned match.
    pub match_id: MatchId,
    /// Teams playing (denormalized for query convenience).
    pub teams: [String; 2],
    /// Court name.
    pub court: String,
    /// Tournament day of the court window.
    pub day: u32,
    /// Slot index within the court-day.
    pub slot: usize,
    /// Start (tournament-axis minutes).
    pub start: i64,
    /// End (tournament-axis minutes, exclusive).
    pub end: i64,
}

/// Hard scheduling constraints, in the order placements are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardConstraint {
    /// The match does not fit inside any court window.
    CourtWindow,
    /// A team play-after/before window excludes every fitting slot.
    TeamWindow,
    /// The court is already taken at that time.
    CourtOverlap,
    /// A team already plays at that time.
    TeamOverlap,
    /// A team would not get its minimum break.
    MinimumBreak,
    /// A team already reached its daily match cap.
    DailyLimit,
    /// A participant is still a placeholder.
    UnresolvedParticipant,
}

impl fmt::Display for HardConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HardConstraint::CourtWindow => "match does not fit any court window",
            HardConstraint::TeamWindow => "team play window excludes every slot",
            HardConstraint::CourtOverlap => "court already occupied",
            HardConstraint::TeamOverlap => "team already playing",
            HardConstraint::MinimumBreak => "minimum break not met",
            HardConstraint::DailyLimit => "daily match limit reached",
            HardConstraint::UnresolvedParticipant => "participant not yet resolved",
        };
        f.write_str(text)
    }
}

/// A match with no valid placement anywhere in the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unscheduled {
    /// The match.
    pub match_id: MatchId,
    /// Constraint that rejected it.
    pub reason: HardConstraint,
}

impl Assignment {
    /// Occupied interval.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    /// Duration (minutes).
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Clock time the match starts.
    pub fn start_time(&self) -> NaiveTime {
        calendar::to_clock(self.start).1
    }

    /// Whether `team` plays in this assignment.
    pub fn involves(&self, team: &str) -> bool {
        self.teams.iter().any(|t| t == team)
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment.
    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    /// Records an unscheduled match.
    pub fn add_unscheduled(&mut self, match_id: MatchId, reason: HardConstraint) {
        self.unscheduled.push(Unscheduled { match_id, reason });
    }

    /// Whether every match was placed.
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }

    /// Latest end across all assignments.
    pub fn last_end(&self) -> Option<i64> {
        self.assignments.iter().map(|a| a.end).max()
    }

    /// Earliest start across all assignments.
    pub fn first_start(&self) -> Option<i64> {
        self.assignments.iter().map(|a| a.start).min()
    }

    /// Elapsed minutes from the first start to the last end.
    pub fn makespan(&self) -> i64 {
        match (self.first_start(), self.last_end()) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }

    /// Finds the assignment for a match.
    pub fn assignment_for(&self, match_id: &MatchId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| &a.match_id == match_id)
    }

    /// Why a match was left unscheduled.
    pub fn unscheduled_reason(&self, match_id: &MatchId) -> Option<HardConstraint> {
        self.unscheduled
            .iter()
            .find(|u| &u.match_id == match_id)
            .map(|u| u.reason)
    }

    /// Assignments on one court, ordered by start.
    pub fn assignments_for_court(&self, court: &str) -> Vec<&Assignment> {
        let mut list: Vec<&Assignment> =
            self.assignments.iter().filter(|a| a.court == court).collect();
        list.sort_by_key(|a| a.start);
        list
    }

    /// Assignments of one team, ordered by start.
    pub fn assignments_for_team(&self, team: &str) -> Vec<&Assignment> {
        let mut list: Vec<&Assignment> =
            self.assignments.iter().filter(|a| a.involves(team)).collect();
        list.sort_by_key(|a| a.start);
        list
    }

    /// Busy minutes per court divided by the makespan.
    pub fn court_utilization(&self) -> HashMap<String, f64> {
        let horizon = self.makespan();
        if horizon <= 0 {
            return HashMap::new();
        }

        let mut busy: HashMap<String, i64> = HashMap::new();
        for a in &self.assignments {
            *busy.entry(a.court.clone()).or_insert(0) += a.duration();
        }

        busy.into_iter()
            .map(|(court, minutes)| (court, minutes as f64 / horizon as f64))
            .collect()
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }
}
