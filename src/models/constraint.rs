//! Declared scheduling rules.
//!
//! A [`ConstraintSet`] holds the global timing rules of a tournament (match
//! length, minimum break, slot granularity, daily cap), per-team play windows,
//! and the soft preference against near-consecutive matches. It is the raw
//! declaration; [`crate::compiler`] turns it into the slot-indexed form both
//! schedulers consume.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Global and per-team scheduling rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    /// Default match length (minutes).
    pub match_duration_min: i64,
    /// Minimum rest between two matches of one team (minutes).
    pub break_min: i64,
    /// Slot granularity (minutes).
    pub granularity_min: i64,
    /// Maximum matches per team per day. `None` = unlimited.
    pub max_matches_per_day: Option<u32>,
    /// Team-specific play windows.
    pub team_rules: Vec<TeamRule>,
    /// Soft: penalize matches of one team that start close together.
    pub avoid_consecutive: bool,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            match_duration_min: 60,
            break_min: 15,
            granularity_min: 15,
            max_matches_per_day: None,
            team_rules: Vec::new(),
            avoid_consecutive: true,
        }
    }
}

impl ConstraintSet {
    /// Creates the default rule set (60-minute matches, 15-minute breaks).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the match duration.
    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.match_duration_min = minutes;
        self
    }

    /// Sets the minimum break.
    pub fn with_break(mut self, minutes: i64) -> Self {
        self.break_min = minutes;
        self
    }

    /// Sets the slot granularity.
    pub fn with_granularity(mut self, minutes: i64) -> Self {
        self.granularity_min = minutes;
        self
    }

    /// Caps matches per team per day.
    pub fn with_max_per_day(mut self, max: u32) -> Self {
        self.max_matches_per_day = Some(max);
        self
    }

    /// Adds a team rule.
    pub fn with_rule(mut self, rule: TeamRule) -> Self {
        self.team_rules.push(rule);
        self
    }

    /// Enables or disables the near-consecutive penalty.
    pub fn avoiding_consecutive(mut self, enabled: bool) -> Self {
        self.avoid_consecutive = enabled;
        self
    }

    /// Start-to-start distance below which two matches of one team count as
    /// near-consecutive: twice (duration + break).
    pub fn near_threshold(&self) -> i64 {
        2 * (self.match_duration_min + self.break_min)
    }
}

/// A play window for one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRule {
    /// Team the rule applies to.
    pub team: String,
    /// The window.
    pub window: TeamWindow,
    /// Day the rule applies to. `None` = every day.
    pub day: Option<u32>,
}

/// Team play window kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamWindow {
    /// Matches must start at or after this clock time.
    PlayAfter(NaiveTime),
    /// Matches must finish at or before this clock time.
    PlayBefore(NaiveTime),
}

impl TeamRule {
    /// Team may only start at or after `time`, every day.
    pub fn play_after(team: impl Into<String>, time: NaiveTime) -> Self {
        Self {
            team: team.into(),
            window: TeamWindow::PlayAfter(time),
            day: None,
        }
    }

    /// Team must finish at or before `time`, every day.
    pub fn play_before(team: impl Into<String>, time: NaiveTime) -> Self {
        Self {
            team: team.into(),
            window: TeamWindow::PlayBefore(time),
            day: None,
        }
    }

    /// Restricts the rule to one day.
    pub fn on_day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ConstraintSet::default();
        assert_eq!(c.match_duration_min, 60);
        assert_eq!(c.break_min, 15);
        assert_eq!(c.granularity_min, 15);
        assert!(c.avoid_consecutive);
        assert_eq!(c.near_threshold(), 150);
    }

    #[test]
    fn test_builder() {
        let eight = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        let c = ConstraintSet::new()
            .with_duration(45)
            .with_break(10)
            .with_granularity(5)
            .with_max_per_day(3)
            .with_rule(TeamRule::play_after("Ants", eight).on_day(1))
            .avoiding_consecutive(false);

        assert_eq!(c.match_duration_min, 45);
        assert_eq!(c.max_matches_per_day, Some(3));
        assert_eq!(c.team_rules[0].day, Some(1));
        assert_eq!(c.team_rules[0].window, TeamWindow::PlayAfter(eight));
        assert!(!c.avoid_consecutive);
    }

    #[test]
    fn test_partial_declaration_uses_defaults() {
        let c: ConstraintSet = serde_json::from_str(r#"{"break_min": 5}"#).unwrap();
        assert_eq!(c.break_min, 5);
        assert_eq!(c.match_duration_min, 60);
    }
}
