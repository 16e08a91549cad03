//! Constraint compiler.
//!
//! Turns raw declarations (courts, [`ConstraintSet`], matches) into the
//! slot-indexed form shared by the optimizing and the greedy scheduler:
//!
//! - a flat, chronologically ordered slot list over all usable court-days,
//! - per team with play windows, which slots each window admits and the
//!   latest end it allows there,
//! - one [`Job`] per schedulable match with its fitting candidate slots.
//!
//! Compilation never fails. Invalid declarations are recorded in
//! [`CompiledProblem::issues`] and replaced by safe values; a team window (or
//! set of windows for one team) that no fitting slot satisfies is dropped and
//! listed in
//! [`CompiledProblem::unconstrained`] so the team is scheduled as if it had
//! declared nothing.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};

use crate::error::ConfigurationError;
use crate::models::calendar::{self, MINUTES_PER_DAY};
use crate::models::{
    ConstraintSet, Court, HardConstraint, Match, MatchId, Team, TeamRule, TeamWindow, TimeWindow,
    Unscheduled,
};
use crate::slots::SlotGrid;

/// One start slot in the flattened slot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Index into [`SlotGrid::court_days`].
    pub court_day: usize,
    /// Slot index within its court-day.
    pub index: usize,
    /// Start minute.
    pub start: i64,
}

/// A match ready for placement.
#[derive(Debug, Clone)]
pub struct Job {
    /// Position of the match in the input list.
    pub match_index: usize,
    /// Match identity.
    pub match_id: MatchId,
    /// Pool for pool-phase matches.
    pub pool: Option<String>,
    /// Interned team indices (see [`JobSet::team_names`]).
    pub teams: [usize; 2],
    /// Duration (minutes).
    pub duration: i64,
    /// Fitting, window-respecting slots in chronological order.
    pub candidates: Vec<usize>,
    /// Why `candidates` is empty, if it is.
    pub blocked: Option<HardConstraint>,
}

/// Jobs derived from a match list.
#[derive(Debug, Clone, Default)]
pub struct JobSet {
    /// Schedulable matches.
    pub jobs: Vec<Job>,
    /// Team names by interned index.
    pub team_names: Vec<String>,
    /// Matches that can never be placed in this run.
    pub rejected: Vec<Unscheduled>,
}

/// Slot-indexed scheduling problem.
#[derive(Debug, Clone)]
pub struct CompiledProblem {
    /// Usable court-days.
    pub grid: SlotGrid,
    /// All slots, ordered by (start, court, day).
    pub slots: Vec<Slot>,
    /// Default match duration (minutes).
    pub match_duration: i64,
    /// Minimum break between two matches of one team (minutes).
    pub break_min: i64,
    /// Start-to-start distance below which a team's matches are near-consecutive.
    pub near_threshold: i64,
    /// Per-team daily cap.
    pub max_per_day: Option<u32>,
    /// Whether the near-consecutive penalty is active.
    pub avoid_consecutive: bool,
    /// Rules dropped because no slot satisfies them.
    pub unconstrained: Vec<TeamRule>,
    /// Every configuration problem met while compiling.
    pub issues: Vec<ConfigurationError>,
    team_windows: HashMap<String, TeamWindows>,
}

/// Compiled play windows of one team, indexed by slot.
#[derive(Debug, Clone)]
struct TeamWindows {
    /// Whether the slot's start passes every play-after rule.
    after: Vec<bool>,
    /// Latest end allowed by play-before rules at the slot.
    before: Vec<Option<i64>>,
    rules: Vec<TeamRule>,
}

impl TeamWindows {
    fn admits(&self, slots: &[Slot], slot: usize, duration: i64) -> bool {
        let start_ok = self.after.get(slot).copied().unwrap_or(false);
        let end_ok = self
            .before
            .get(slot)
            .is_some_and(|limit| limit.is_none_or(|l| slots[slot].start + duration <= l));
        start_ok && end_ok
    }

    fn merge(&mut self, other: TeamWindows) {
        for (allowed, new) in self.after.iter_mut().zip(other.after) {
            *allowed &= new;
        }
        for (limit, new) in self.before.iter_mut().zip(other.before) {
            *limit = match (*limit, new) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        self.rules.extend(other.rules);
    }
}

impl CompiledProblem {
    /// Compiles declarations into the slot-indexed form.
    pub fn compile(teams: &[Team], courts: &[Court], constraints: &ConstraintSet) -> Self {
        let defaults = ConstraintSet::default();
        let mut issues = Vec::new();

        let grid = SlotGrid::build(courts, constraints.granularity_min);
        issues.extend(grid.excluded.iter().cloned());

        let match_duration = if constraints.match_duration_min > 0 {
            constraints.match_duration_min
        } else {
            warn!(
                "match duration {} min is not positive, using {}",
                constraints.match_duration_min, defaults.match_duration_min
            );
            issues.push(ConfigurationError::InvalidDuration(
                constraints.match_duration_min,
            ));
            defaults.match_duration_min
        };

        let break_min = if constraints.break_min >= 0 {
            constraints.break_min
        } else {
            warn!("break {} min is negative, using 0", constraints.break_min);
            issues.push(ConfigurationError::NegativeBreak(constraints.break_min));
            0
        };

        let mut slots: Vec<Slot> = grid
            .court_days
            .iter()
            .enumerate()
            .flat_map(|(court_day, cd)| {
                cd.starts.iter().enumerate().map(move |(index, &start)| Slot {
                    court_day,
                    index,
                    start,
                })
            })
            .collect();
        slots.sort_by_key(|s| {
            let cd = &grid.court_days[s.court_day];
            (s.start, cd.court_index, cd.day)
        });

        let mut problem = Self {
            grid,
            slots,
            match_duration,
            break_min,
            near_threshold: 2 * (match_duration + break_min),
            max_per_day: constraints.max_matches_per_day,
            avoid_consecutive: constraints.avoid_consecutive,
            unconstrained: Vec::new(),
            issues,
            team_windows: HashMap::new(),
        };

        let known: HashSet<&str> = teams.iter().map(|t| t.name.as_str()).collect();
        for rule in &constraints.team_rules {
            if !known.contains(rule.team.as_str()) {
                warn!("dropping rule for unknown team '{}'", rule.team);
                problem
                    .issues
                    .push(ConfigurationError::UnknownTeam(rule.team.clone()));
                continue;
            }
            problem.add_rule(rule);
        }
        problem.drop_conflicting_windows();

        debug!(
            "compiled {} slots over {} court-days, {} constrained teams, {} unconstrained rules",
            problem.slots.len(),
            problem.grid.court_days.len(),
            problem.team_windows.len(),
            problem.unconstrained.len()
        );
        problem
    }

    /// Compiles one team rule into the team's windows, or marks it
    /// unconstrained.
    fn add_rule(&mut self, rule: &TeamRule) {
        let mut after = Vec::with_capacity(self.slots.len());
        let mut before = Vec::with_capacity(self.slots.len());

        for slot in &self.slots {
            let cd = &self.grid.court_days[slot.court_day];
            let applies = rule.day.is_none_or(|d| d == cd.day);
            let day_start = i64::from(cd.day) * MINUTES_PER_DAY;
            let (passes, limit) = match rule.window {
                _ if !applies => (true, None),
                TeamWindow::PlayAfter(t) => {
                    (slot.start - day_start >= calendar::minute_of_day(t), None)
                }
                TeamWindow::PlayBefore(t) => {
                    (true, Some(day_start + calendar::minute_of_day(t)))
                }
            };
            after.push(passes);
            before.push(limit);
        }

        let windows = TeamWindows {
            after,
            before,
            rules: vec![rule.clone()],
        };
        let duration = self.match_duration;
        let satisfiable = (0..self.slots.len())
            .any(|s| self.fits(s, duration) && windows.admits(&self.slots, s, duration));
        if !satisfiable {
            warn!(
                "window {:?} for team '{}' admits no slot, treating the team as unconstrained",
                rule.window, rule.team
            );
            self.issues
                .push(ConfigurationError::UnsatisfiableWindow(rule.team.clone()));
            self.unconstrained.push(rule.clone());
            return;
        }

        match self.team_windows.get_mut(&rule.team) {
            Some(existing) => existing.merge(windows),
            None => {
                self.team_windows.insert(rule.team.clone(), windows);
            }
        }
    }

    /// Drops every rule of a team whose rules admit no common slot.
    fn drop_conflicting_windows(&mut self) {
        let mut names: Vec<String> = self.team_windows.keys().cloned().collect();
        names.sort();
        for team in names {
            let duration = self.match_duration;
            let open = (0..self.slots.len())
                .any(|s| self.fits(s, duration) && self.admits(&team, s, duration));
            if open {
                continue;
            }
            if let Some(windows) = self.team_windows.remove(&team) {
                warn!(
                    "windows for team '{team}' admit no common slot, treating the team as unconstrained"
                );
                self.issues
                    .push(ConfigurationError::UnsatisfiableWindow(team.clone()));
                self.unconstrained.extend(windows.rules);
            }
        }
    }

    /// Whether a match of `duration` minutes started at `slot` ends inside
    /// its court window.
    pub fn fits(&self, slot: usize, duration: i64) -> bool {
        self.slots[slot].start + duration <= self.window_of_slot(slot).end
    }

    /// Whether `team`'s windows admit a match of `duration` minutes at `slot`.
    pub fn admits(&self, team: &str, slot: usize, duration: i64) -> bool {
        self.team_windows
            .get(team)
            .is_none_or(|w| w.admits(&self.slots, slot, duration))
    }

    /// Whether `team` has an active window rule.
    pub fn is_constrained(&self, team: &str) -> bool {
        self.team_windows.contains_key(team)
    }

    /// Court-day window holding `slot`.
    pub fn window_of_slot(&self, slot: usize) -> TimeWindow {
        self.grid.court_days[self.slots[slot].court_day].window
    }

    /// Court position of `slot` in the input court list.
    pub fn court_of_slot(&self, slot: usize) -> usize {
        self.grid.court_days[self.slots[slot].court_day].court_index
    }

    /// Tournament day of `slot`.
    pub fn day_of_slot(&self, slot: usize) -> u32 {
        self.grid.court_days[self.slots[slot].court_day].day
    }

    /// Interval a job occupies when started at `slot`.
    pub fn placement(&self, job: &Job, slot: usize) -> TimeWindow {
        let start = self.slots[slot].start;
        TimeWindow::new(start, start + job.duration)
    }

    /// Earliest opening minute of any usable court.
    pub fn opening(&self) -> i64 {
        self.grid.opening().unwrap_or(0)
    }

    /// Derives jobs from matches.
    ///
    /// Matches with placeholder participants are rejected with
    /// [`HardConstraint::UnresolvedParticipant`]; they become schedulable in a
    /// later run once the bracket resolves them.
    pub fn jobs(&self, matches: &[Match]) -> JobSet {
        let mut set = JobSet::default();
        let mut interned: HashMap<String, usize> = HashMap::new();

        for (match_index, m) in matches.iter().enumerate() {
            let Some(names) = m.teams() else {
                set.rejected.push(Unscheduled {
                    match_id: m.id.clone(),
                    reason: HardConstraint::UnresolvedParticipant,
                });
                continue;
            };

            let mut teams = [0usize; 2];
            for (k, name) in names.iter().enumerate() {
                let next = set.team_names.len();
                let index = *interned.entry((*name).to_string()).or_insert(next);
                if index == next {
                    set.team_names.push((*name).to_string());
                }
                teams[k] = index;
            }

            let duration = m
                .duration_min
                .filter(|&d| d > 0)
                .unwrap_or(self.match_duration);

            let fitting: Vec<usize> = (0..self.slots.len())
                .filter(|&s| self.fits(s, duration))
                .collect();
            let candidates: Vec<usize> = fitting
                .iter()
                .copied()
                .filter(|&s| names.iter().all(|team| self.admits(team, s, duration)))
                .collect();

            let blocked = if fitting.is_empty() {
                Some(HardConstraint::CourtWindow)
            } else if candidates.is_empty() {
                Some(HardConstraint::TeamWindow)
            } else {
                None
            };

            set.jobs.push(Job {
                match_index,
                match_id: m.id.clone(),
                pool: m.phase.pool().map(str::to_string),
                teams,
                duration,
                candidates,
                blocked,
            });
        }

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;
    use chrono::NaiveTime;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn teams() -> Vec<Team> {
        vec![
            Team::new("Ants", "A", 1),
            Team::new("Bees", "A", 2),
            Team::new("Cats", "B", 1),
        ]
    }

    fn pool_match(id: &str, home: &str, away: &str) -> Match {
        Match::between(MatchId::from_raw(id), Phase::Pool("A".into()), 1, home, away)
    }

    #[test]
    fn test_slots_are_chronological_across_courts() {
        let courts = vec![
            Court::new("C1").with_day(0, hm(10, 0), hm(11, 0)),
            Court::new("C2").with_day(0, hm(9, 0), hm(11, 0)),
        ];
        let p = CompiledProblem::compile(&teams(), &courts, &ConstraintSet::new().with_granularity(30));
        let starts: Vec<i64> = p.slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![540, 570, 600, 600, 630, 630]);
        // Same start: court order breaks the tie
        assert_eq!(p.court_of_slot(2), 0);
        assert_eq!(p.court_of_slot(3), 1);
    }

    #[test]
    fn test_invalid_duration_falls_back() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let p = CompiledProblem::compile(&teams(), &courts, &ConstraintSet::new().with_duration(0));
        assert_eq!(p.match_duration, 60);
        assert!(p.issues.contains(&ConfigurationError::InvalidDuration(0)));
    }

    #[test]
    fn test_play_after_window() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let rules = ConstraintSet::new().with_rule(TeamRule::play_after("Ants", hm(15, 0)));
        let p = CompiledProblem::compile(&teams(), &courts, &rules);

        assert!(p.is_constrained("Ants"));
        assert!(p.unconstrained.is_empty());
        let jobs = p.jobs(&[pool_match("m1", "Ants", "Bees")]);
        let first = jobs.jobs[0].candidates[0];
        assert_eq!(p.slots[first].start, 15 * 60);
        // Last fitting start is 17:00 for a 60-minute match
        let last = *jobs.jobs[0].candidates.last().unwrap();
        assert_eq!(p.slots[last].start, 17 * 60);
    }

    #[test]
    fn test_play_before_window() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let rules = ConstraintSet::new().with_rule(TeamRule::play_before("Bees", hm(11, 0)));
        let p = CompiledProblem::compile(&teams(), &courts, &rules);
        let jobs = p.jobs(&[pool_match("m1", "Ants", "Bees")]);
        let last = *jobs.jobs[0].candidates.last().unwrap();
        assert_eq!(p.slots[last].start, 10 * 60);
    }

    #[test]
    fn test_play_before_uses_the_match_duration() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let rules = ConstraintSet::new()
            .with_granularity(60)
            .with_rule(TeamRule::play_before("Bees", hm(11, 0)));
        let p = CompiledProblem::compile(&teams(), &courts, &rules);
        let jobs = p.jobs(&[
            pool_match("m1", "Ants", "Bees"),
            pool_match("m2", "Ants", "Bees").with_duration(120),
            pool_match("m3", "Ants", "Bees").with_duration(180),
        ]);

        let starts = |j: usize| -> Vec<i64> {
            jobs.jobs[j].candidates.iter().map(|&s| p.slots[s].start).collect()
        };
        assert_eq!(starts(0), vec![540, 600]);
        // A two-hour match must start at 09:00 to end by 11:00
        assert_eq!(starts(1), vec![540]);
        assert!(starts(2).is_empty());
        assert_eq!(jobs.jobs[2].blocked, Some(HardConstraint::TeamWindow));
    }

    #[test]
    fn test_conflicting_windows_of_one_team_are_unconstrained() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let after = TeamRule::play_after("Ants", hm(15, 0));
        let before = TeamRule::play_before("Ants", hm(12, 0));
        let rules = ConstraintSet::new()
            .with_rule(after.clone())
            .with_rule(before.clone());
        let p = CompiledProblem::compile(&teams(), &courts, &rules);

        assert!(!p.is_constrained("Ants"));
        assert_eq!(p.unconstrained, vec![after, before]);
        assert_eq!(
            p.issues,
            vec![ConfigurationError::UnsatisfiableWindow("Ants".into())]
        );
        let jobs = p.jobs(&[pool_match("m1", "Ants", "Bees")]);
        assert!(jobs.jobs[0].blocked.is_none());
        assert_eq!(p.slots[jobs.jobs[0].candidates[0]].start, 9 * 60);
    }

    #[test]
    fn test_compatible_windows_of_one_team_combine() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let rules = ConstraintSet::new()
            .with_granularity(60)
            .with_rule(TeamRule::play_after("Ants", hm(11, 0)))
            .with_rule(TeamRule::play_before("Ants", hm(14, 0)));
        let p = CompiledProblem::compile(&teams(), &courts, &rules);

        assert!(p.unconstrained.is_empty());
        let jobs = p.jobs(&[pool_match("m1", "Ants", "Bees")]);
        let starts: Vec<i64> = jobs.jobs[0].candidates.iter().map(|&s| p.slots[s].start).collect();
        assert_eq!(starts, vec![660, 720, 780]);
    }

    #[test]
    fn test_unsatisfiable_window_is_unconstrained() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let rules = ConstraintSet::new().with_rule(TeamRule::play_after("Ants", hm(20, 0)));
        let p = CompiledProblem::compile(&teams(), &courts, &rules);

        assert!(!p.is_constrained("Ants"));
        assert_eq!(p.unconstrained.len(), 1);
        assert!(p
            .issues
            .contains(&ConfigurationError::UnsatisfiableWindow("Ants".into())));
        let jobs = p.jobs(&[pool_match("m1", "Ants", "Bees")]);
        assert!(jobs.jobs[0].blocked.is_none());
    }

    #[test]
    fn test_day_specific_rule() {
        let courts = vec![Court::daily("C1", 2, hm(9, 0), hm(12, 0))];
        let rules =
            ConstraintSet::new().with_rule(TeamRule::play_after("Ants", hm(11, 0)).on_day(1));
        let p = CompiledProblem::compile(&teams(), &courts, &rules);
        let jobs = p.jobs(&[pool_match("m1", "Ants", "Bees")]);
        let days: HashSet<u32> = jobs.jobs[0]
            .candidates
            .iter()
            .map(|&s| p.day_of_slot(s))
            .collect();
        // Day 0 is untouched, day 1 only from 11:00
        assert!(days.contains(&0));
        assert!(jobs.jobs[0]
            .candidates
            .iter()
            .filter(|&&s| p.day_of_slot(s) == 1)
            .all(|&s| p.slots[s].start >= 1440 + 660));
    }

    #[test]
    fn test_unknown_team_rule() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let rules = ConstraintSet::new().with_rule(TeamRule::play_after("Ghosts", hm(10, 0)));
        let p = CompiledProblem::compile(&teams(), &courts, &rules);
        assert_eq!(p.issues, vec![ConfigurationError::UnknownTeam("Ghosts".into())]);
    }

    #[test]
    fn test_jobs() {
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(10, 0))];
        let p = CompiledProblem::compile(&teams(), &courts, &ConstraintSet::new());
        let matches = vec![
            pool_match("m1", "Ants", "Bees"),
            pool_match("m2", "Bees", "Cats").with_duration(90),
            Match::new(
                MatchId::from_raw("WB-R1-M1"),
                Phase::Bracket(crate::models::BracketSide::Winners),
                1,
                crate::models::Participant::Placeholder("#1 A".into()),
                crate::models::Participant::Team("Cats".into()),
            ),
        ];
        let set = p.jobs(&matches);

        assert_eq!(set.jobs.len(), 2);
        assert_eq!(set.team_names, vec!["Ants", "Bees", "Cats"]);
        assert_eq!(set.jobs[1].teams, [1, 2]);
        assert_eq!(set.jobs[0].candidates.len(), 1); // only 09:00 fits a 60-minute match
        assert_eq!(set.jobs[1].blocked, Some(HardConstraint::CourtWindow));
        assert_eq!(set.rejected.len(), 1);
        assert_eq!(set.rejected[0].reason, HardConstraint::UnresolvedParticipant);
    }
}
