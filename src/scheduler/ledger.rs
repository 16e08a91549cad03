//! Occupancy ledger shared by both schedulers.
//!
//! Tracks what is already placed (per court, per team, per team-day) and
//! answers whether one more placement keeps every hard constraint. Placements
//! can be removed again, which the branch-and-bound search relies on when it
//! backtracks.

use std::collections::HashMap;

use crate::compiler::{CompiledProblem, Job};
use crate::models::{HardConstraint, TimeWindow};

/// Placed intervals per court and per team.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    court_busy: Vec<Vec<TimeWindow>>,
    team_busy: Vec<Vec<TimeWindow>>,
    team_day: HashMap<(usize, u32), u32>,
}

impl Ledger {
    /// Empty ledger sized for a problem and its interned teams.
    pub fn new(problem: &CompiledProblem, team_count: usize) -> Self {
        let courts = problem
            .grid
            .court_days
            .iter()
            .map(|cd| cd.court_index + 1)
            .max()
            .unwrap_or(0);
        Self {
            court_busy: vec![Vec::new(); courts],
            team_busy: vec![Vec::new(); team_count],
            team_day: HashMap::new(),
        }
    }

    /// Checks a placement against the placed state.
    ///
    /// Returns the first violated constraint in the order court overlap,
    /// team overlap, minimum break, daily limit.
    pub fn check(
        &self,
        problem: &CompiledProblem,
        job: &Job,
        slot: usize,
    ) -> Result<(), HardConstraint> {
        let window = problem.placement(job, slot);
        let court = problem.court_of_slot(slot);

        if self.court_busy[court].iter().any(|w| w.overlaps(&window)) {
            return Err(HardConstraint::CourtOverlap);
        }

        let busy = || job.teams.iter().flat_map(|&t| self.team_busy[t].iter());
        if busy().any(|w| w.overlaps(&window)) {
            return Err(HardConstraint::TeamOverlap);
        }
        if busy().any(|w| w.gap_to(&window) < problem.break_min) {
            return Err(HardConstraint::MinimumBreak);
        }

        if let Some(max) = problem.max_per_day {
            let day = problem.day_of_slot(slot);
            if job.teams.iter().any(|&t| self.played_on(t, day) >= max) {
                return Err(HardConstraint::DailyLimit);
            }
        }

        Ok(())
    }

    /// Records a placement. The caller has checked it.
    pub fn place(&mut self, problem: &CompiledProblem, job: &Job, slot: usize) {
        let window = problem.placement(job, slot);
        let day = problem.day_of_slot(slot);
        self.court_busy[problem.court_of_slot(slot)].push(window);
        for &team in &job.teams {
            self.team_busy[team].push(window);
            *self.team_day.entry((team, day)).or_insert(0) += 1;
        }
    }

    /// Undoes [`Ledger::place`].
    pub fn remove(&mut self, problem: &CompiledProblem, job: &Job, slot: usize) {
        let window = problem.placement(job, slot);
        let day = problem.day_of_slot(slot);
        remove_window(&mut self.court_busy[problem.court_of_slot(slot)], window);
        for &team in &job.teams {
            remove_window(&mut self.team_busy[team], window);
            if let Some(count) = self.team_day.get_mut(&(team, day)) {
                *count = count.saturating_sub(1);
            }
        }
    }

    /// Matches `team` plays on `day`.
    pub fn played_on(&self, team: usize, day: u32) -> u32 {
        self.team_day.get(&(team, day)).copied().unwrap_or(0)
    }

    /// Smallest rest gap the placement would create for either team.
    pub fn rest_gap(&self, problem: &CompiledProblem, job: &Job, slot: usize) -> Option<i64> {
        let window = problem.placement(job, slot);
        job.teams
            .iter()
            .flat_map(|&t| self.team_busy[t].iter())
            .map(|w| w.gap_to(&window))
            .min()
    }

    /// Near-consecutive pairs the placement would add.
    pub fn near_pairs(&self, problem: &CompiledProblem, job: &Job, slot: usize) -> u32 {
        let start = problem.slots[slot].start;
        let count = job
            .teams
            .iter()
            .flat_map(|&t| self.team_busy[t].iter())
            .filter(|w| (w.start - start).abs() < problem.near_threshold)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

fn remove_window(list: &mut Vec<TimeWindow>, window: TimeWindow) {
    if let Some(pos) = list.iter().position(|w| *w == window) {
        list.swap_remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstraintSet, Court, Match, MatchId, Phase, Team};
    use chrono::NaiveTime;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn setup(constraints: ConstraintSet) -> (CompiledProblem, Vec<Job>, usize) {
        let teams = vec![
            Team::new("Ants", "A", 1),
            Team::new("Bees", "A", 2),
            Team::new("Cats", "A", 3),
        ];
        let courts = vec![
            Court::daily("C1", 2, hm(9, 0), hm(18, 0)),
            Court::daily("C2", 2, hm(9, 0), hm(18, 0)),
        ];
        let matches = vec![
            Match::between(MatchId::from_raw("m1"), Phase::Pool("A".into()), 1, "Ants", "Bees"),
            Match::between(MatchId::from_raw("m2"), Phase::Pool("A".into()), 2, "Ants", "Cats"),
        ];
        let problem = CompiledProblem::compile(&teams, &courts, &constraints);
        let set = problem.jobs(&matches);
        let count = set.team_names.len();
        (problem, set.jobs, count)
    }

    fn slot_at(problem: &CompiledProblem, start: i64, court: usize) -> usize {
        (0..problem.slots.len())
            .find(|&s| problem.slots[s].start == start && problem.court_of_slot(s) == court)
            .unwrap()
    }

    #[test]
    fn test_overlaps() {
        let (problem, jobs, teams) = setup(ConstraintSet::new());
        let mut ledger = Ledger::new(&problem, teams);
        let s900 = slot_at(&problem, 540, 0);
        ledger.place(&problem, &jobs[0], s900);

        // Same court, same time
        assert_eq!(ledger.check(&problem, &jobs[1], s900), Err(HardConstraint::CourtOverlap));
        // Other court, Ants already playing
        let c2 = slot_at(&problem, 570, 1);
        assert_eq!(ledger.check(&problem, &jobs[1], c2), Err(HardConstraint::TeamOverlap));
    }

    #[test]
    fn test_break() {
        let (problem, jobs, teams) = setup(ConstraintSet::new().with_break(15));
        let mut ledger = Ledger::new(&problem, teams);
        ledger.place(&problem, &jobs[0], slot_at(&problem, 540, 0));

        // 10:00 leaves no break
        let s1000 = slot_at(&problem, 600, 1);
        assert_eq!(ledger.check(&problem, &jobs[1], s1000), Err(HardConstraint::MinimumBreak));
        // 10:15 is exactly enough
        let s1015 = slot_at(&problem, 615, 0);
        assert_eq!(ledger.check(&problem, &jobs[1], s1015), Ok(()));
        assert_eq!(ledger.rest_gap(&problem, &jobs[1], s1015), Some(15));
        assert_eq!(ledger.near_pairs(&problem, &jobs[1], s1015), 1);
    }

    #[test]
    fn test_daily_limit() {
        let (problem, jobs, teams) = setup(ConstraintSet::new().with_max_per_day(1));
        let mut ledger = Ledger::new(&problem, teams);
        ledger.place(&problem, &jobs[0], slot_at(&problem, 540, 0));

        assert_eq!(
            ledger.check(&problem, &jobs[1], slot_at(&problem, 900, 0)),
            Err(HardConstraint::DailyLimit)
        );
        // Next day is fine
        assert_eq!(ledger.check(&problem, &jobs[1], slot_at(&problem, 1440 + 540, 0)), Ok(()));
    }

    #[test]
    fn test_remove_restores() {
        let (problem, jobs, teams) = setup(ConstraintSet::new());
        let mut ledger = Ledger::new(&problem, teams);
        let s = slot_at(&problem, 540, 0);
        ledger.place(&problem, &jobs[0], s);
        ledger.remove(&problem, &jobs[0], s);

        assert_eq!(ledger.check(&problem, &jobs[1], s), Ok(()));
        assert_eq!(ledger.played_on(0, 0), 0);
        assert_eq!(ledger.rest_gap(&problem, &jobs[1], s), None);
    }
}
