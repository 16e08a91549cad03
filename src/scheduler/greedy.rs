//! Greedy fallback scheduler.
//!
//! # Algorithm
//!
//! 1. Order matches with a [`RuleEngine`] (default: pool phase first, then
//!    declaration order).
//! 2. For each match, scan its candidate slots chronologically and keep the
//!    ones the [`Ledger`] accepts.
//! 3. Take the earliest feasible start. Among courts free at that start,
//!    prefer the one with the fewest matches of the same pool so far, then
//!    the lower court index.
//! 4. If that placement makes a team play near-consecutively, take the
//!    earliest placement that does not, provided it ends no later than the
//!    current last end (or the earliest option's end) plus the tolerance.
//! 5. A match with no feasible slot is reported with the constraint that
//!    rejected its earliest candidate; the run continues.
//!
//! # Complexity
//! O(n * s * k) where n = matches, s = candidate slots, k = placed matches
//! per court or team.

use log::debug;
use std::collections::HashMap;

use crate::compiler::{CompiledProblem, JobSet};
use crate::dispatching::{DispatchContext, RuleEngine};
use crate::models::{HardConstraint, Match, Unscheduled};

use super::Ledger;

/// Placements chosen by the greedy scheduler.
#[derive(Debug, Clone, Default)]
pub struct GreedyOutcome {
    /// Chosen slot per job.
    pub placements: Vec<Option<usize>>,
    /// Jobs left off the courts.
    pub unscheduled: Vec<Unscheduled>,
}

/// Deterministic earliest-slot scheduler.
#[derive(Debug, Clone)]
pub struct GreedyScheduler {
    rule_engine: RuleEngine,
    tolerance: i64,
}

impl GreedyScheduler {
    /// Creates a scheduler with the pool-first order and a 30-minute tolerance.
    pub fn new() -> Self {
        Self {
            rule_engine: RuleEngine::pool_first(),
            tolerance: 30,
        }
    }

    /// Sets the rule engine used to order matches.
    pub fn with_rule_engine(mut self, engine: RuleEngine) -> Self {
        self.rule_engine = engine;
        self
    }

    /// Sets how much later (minutes) a placement may end to avoid a
    /// near-consecutive match.
    pub fn with_tolerance(mut self, minutes: i64) -> Self {
        self.tolerance = minutes;
        self
    }

    /// Places every job it can.
    ///
    /// `matches` is the list the jobs were derived from; it drives the
    /// dispatching order.
    pub fn schedule(
        &self,
        problem: &CompiledProblem,
        set: &JobSet,
        matches: &[Match],
    ) -> GreedyOutcome {
        let mut outcome = GreedyOutcome {
            placements: vec![None; set.jobs.len()],
            unscheduled: Vec::new(),
        };
        let mut ledger = Ledger::new(problem, set.team_names.len());
        let mut pool_load: HashMap<(Option<&str>, usize), usize> = HashMap::new();
        let mut last_end: Option<i64> = None;

        let job_of: HashMap<usize, usize> = set
            .jobs
            .iter()
            .enumerate()
            .map(|(j, job)| (job.match_index, j))
            .collect();

        let context = set
            .team_names
            .iter()
            .filter(|t| problem.is_constrained(t))
            .fold(DispatchContext::for_matches(matches), |ctx, t| {
                ctx.with_constrained_team(t.clone())
            });

        for match_index in self.rule_engine.sort_indices(matches, &context) {
            let Some(&j) = job_of.get(&match_index) else {
                continue;
            };
            let job = &set.jobs[j];

            let feasible: Vec<usize> = job
                .candidates
                .iter()
                .copied()
                .filter(|&s| ledger.check(problem, job, s).is_ok())
                .collect();

            let Some(&first) = feasible.first() else {
                let reason = match job.candidates.first() {
                    Some(&s) => ledger
                        .check(problem, job, s)
                        .err()
                        .unwrap_or(HardConstraint::CourtOverlap),
                    None => job.blocked.unwrap_or(HardConstraint::CourtWindow),
                };
                debug!("{}: no feasible slot ({reason})", job.match_id);
                outcome.unscheduled.push(Unscheduled {
                    match_id: job.match_id.clone(),
                    reason,
                });
                continue;
            };

            let load = |s: usize| {
                let court = problem.court_of_slot(s);
                (pool_load.get(&(job.pool.as_deref(), court)).copied().unwrap_or(0), court)
            };
            let pick_at = |start: i64, clean_only: bool| {
                feasible
                    .iter()
                    .copied()
                    .filter(|&s| problem.slots[s].start == start)
                    .filter(|&s| !clean_only || ledger.near_pairs(problem, job, s) == 0)
                    .min_by_key(|&s| load(s))
            };

            let earliest = problem.slots[first].start;
            let mut chosen = pick_at(earliest, false).unwrap_or(first);

            if problem.avoid_consecutive && ledger.near_pairs(problem, job, chosen) > 0 {
                let limit =
                    last_end.unwrap_or(i64::MIN).max(earliest + job.duration) + self.tolerance;
                let alternative = feasible
                    .iter()
                    .copied()
                    .take_while(|&s| problem.slots[s].start + job.duration <= limit)
                    .find(|&s| ledger.near_pairs(problem, job, s) == 0)
                    .and_then(|s| pick_at(problem.slots[s].start, true));
                if let Some(slot) = alternative {
                    chosen = slot;
                }
            }

            ledger.place(problem, job, chosen);
            *pool_load
                .entry((job.pool.as_deref(), problem.court_of_slot(chosen)))
                .or_insert(0) += 1;
            let end = problem.slots[chosen].start + job.duration;
            last_end = Some(last_end.map_or(end, |e| e.max(end)));
            outcome.placements[j] = Some(chosen);
        }

        outcome
    }
}

impl Default for GreedyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstraintSet, Court, MatchId, Phase, Team, TeamRule};
    use chrono::NaiveTime;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn pool_match(id: &str, pool: &str, home: &str, away: &str) -> Match {
        Match::between(MatchId::from_raw(id), Phase::Pool(pool.into()), 1, home, away)
    }

    fn teams(names: &[&str]) -> Vec<Team> {
        names.iter().map(|n| Team::new(*n, "A", 1)).collect()
    }

    fn run(
        teams: &[Team],
        courts: &[Court],
        constraints: &ConstraintSet,
        matches: &[Match],
    ) -> (CompiledProblem, GreedyOutcome) {
        run_with(GreedyScheduler::new(), teams, courts, constraints, matches)
    }

    fn run_with(
        scheduler: GreedyScheduler,
        teams: &[Team],
        courts: &[Court],
        constraints: &ConstraintSet,
        matches: &[Match],
    ) -> (CompiledProblem, GreedyOutcome) {
        let problem = CompiledProblem::compile(teams, courts, constraints);
        let set = problem.jobs(matches);
        let outcome = scheduler.schedule(&problem, &set, matches);
        (problem, outcome)
    }

    #[test]
    fn test_earliest_with_break() {
        let matches = vec![
            pool_match("m1", "A", "Ants", "Bees"),
            pool_match("m2", "A", "Ants", "Cats"),
        ];
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let (problem, outcome) = run(
            &teams(&["Ants", "Bees", "Cats"]),
            &courts,
            &ConstraintSet::new().avoiding_consecutive(false),
            &matches,
        );

        let starts: Vec<i64> = outcome
            .placements
            .iter()
            .map(|p| problem.slots[p.unwrap()].start)
            .collect();
        assert_eq!(starts, vec![540, 615]);
        assert!(outcome.unscheduled.is_empty());
    }

    #[test]
    fn test_pool_load_balancing() {
        let matches = vec![
            pool_match("m1", "A", "A1", "A2"),
            pool_match("m2", "A", "A3", "A4"),
        ];
        let courts = vec![
            Court::daily("C1", 1, hm(9, 0), hm(18, 0)),
            Court::daily("C2", 1, hm(9, 0), hm(18, 0)),
        ];
        let (problem, outcome) = run(
            &teams(&["A1", "A2", "A3", "A4"]),
            &courts,
            &ConstraintSet::new(),
            &matches,
        );
        let first = outcome.placements[0].unwrap();
        let second = outcome.placements[1].unwrap();
        assert_eq!(problem.slots[first].start, problem.slots[second].start);
        assert_eq!(problem.court_of_slot(first), 0);
        assert_eq!(problem.court_of_slot(second), 1);
    }

    #[test]
    fn test_near_consecutive_tolerance() {
        let matches = vec![
            pool_match("m1", "A", "Ants", "Bees"),
            pool_match("m2", "A", "Ants", "Cats"),
        ];
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let names = teams(&["Ants", "Bees", "Cats"]);

        // 10:15 is near-consecutive for Ants (75 < 150). Escaping needs a
        // start of 11:30, ending 12:30, which is beyond 11:15 + 30.
        let (problem, outcome) = run(&names, &courts, &ConstraintSet::new(), &matches);
        let m2 = outcome.placements[1].unwrap();
        assert_eq!(problem.slots[m2].start, 10 * 60 + 15);

        // A wider tolerance allows it.
        let scheduler = GreedyScheduler::new().with_tolerance(90);
        let (problem, outcome) =
            run_with(scheduler, &names, &courts, &ConstraintSet::new(), &matches);
        let m2 = outcome.placements[1].unwrap();
        assert_eq!(problem.slots[m2].start, 11 * 60 + 30);
    }

    #[test]
    fn test_unscheduled_reasons() {
        let matches = vec![
            pool_match("m1", "A", "Ants", "Bees"),
            pool_match("m2", "A", "Ants", "Cats").with_duration(600),
            pool_match("m3", "A", "Bees", "Cats"),
        ];
        // One slot only
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(10, 0))];
        let (_, outcome) = run(
            &teams(&["Ants", "Bees", "Cats"]),
            &courts,
            &ConstraintSet::new().with_granularity(60),
            &matches,
        );
        assert!(outcome.placements[0].is_some());
        let reasons: Vec<HardConstraint> = outcome.unscheduled.iter().map(|u| u.reason).collect();
        assert_eq!(reasons, vec![HardConstraint::CourtWindow, HardConstraint::CourtOverlap]);
    }

    #[test]
    fn test_team_window_reason() {
        let matches = vec![pool_match("m1", "A", "Ants", "Bees")];
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let constraints = ConstraintSet::new()
            .with_rule(TeamRule::play_after("Ants", hm(15, 0)))
            .with_rule(TeamRule::play_before("Bees", hm(12, 0)));
        let (_, outcome) = run(&teams(&["Ants", "Bees"]), &courts, &constraints, &matches);
        assert_eq!(outcome.unscheduled[0].reason, HardConstraint::TeamWindow);
    }

    #[test]
    fn test_custom_engine_places_constrained_teams_first() {
        use crate::dispatching::rules;

        let matches = vec![
            pool_match("m1", "A", "Ants", "Bees"),
            pool_match("m2", "A", "Cats", "Dogs"),
        ];
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let names = teams(&["Ants", "Bees", "Cats", "Dogs"]);
        let constraints =
            ConstraintSet::new().with_rule(TeamRule::play_before("Dogs", hm(12, 0)));

        let (problem, outcome) = run(&names, &courts, &constraints, &matches);
        assert_eq!(problem.slots[outcome.placements[0].unwrap()].start, 540);

        let engine = RuleEngine::new()
            .with_rule(rules::ConstrainedFirst)
            .with_tie_breaker(rules::DeclarationOrder);
        let scheduler = GreedyScheduler::new().with_rule_engine(engine);
        let (problem, outcome) = run_with(scheduler, &names, &courts, &constraints, &matches);
        assert_eq!(problem.slots[outcome.placements[1].unwrap()].start, 540);
        assert_eq!(problem.slots[outcome.placements[0].unwrap()].start, 600);
    }

    #[test]
    fn test_pool_matches_before_bracket() {
        let bracket = Match::between(
            MatchId::from_raw("WB-R1-M1"),
            Phase::Bracket(crate::models::BracketSide::Winners),
            1,
            "Ants",
            "Bees",
        );
        let matches = vec![bracket, pool_match("m1", "A", "Ants", "Bees")];
        let courts = vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))];
        let (problem, outcome) = run(
            &teams(&["Ants", "Bees"]),
            &courts,
            &ConstraintSet::new(),
            &matches,
        );
        let pool_slot = outcome.placements[1].unwrap();
        let bracket_slot = outcome.placements[0].unwrap();
        assert!(problem.slots[pool_slot].start < problem.slots[bracket_slot].start);
    }
}
