//! Optimizing scheduler.
//!
//! Exact search over the compiled slot model: every schedulable match takes
//! exactly one candidate slot, subject to the hard constraints checked by the
//! [`Ledger`]. Solutions are ranked by [`ObjectiveKey`] (latest end, then
//! minimum rest, then near-consecutive pairs).
//!
//! # Algorithm
//!
//! Depth-first branch-and-bound. Matches are branched on most-constrained
//! first (fewest candidate slots), candidate slots are tried chronologically,
//! and a partial assignment is cut as soon as its key (or a bound on the key
//! of any completion) is no better than the incumbent.
//!
//! The search runs in passes with a geometrically growing node allowance.
//! Passes after the first shuffle candidates that share a start time with a
//! seeded RNG, so each restart explores a different region while the
//! incumbent carries over. A pass that explores its whole tree proves the
//! incumbent optimal (or the problem infeasible).
//!
//! The whole run stops at the wall-clock budget or the node limit and
//! returns the best solution found.
//!
//! # Reference
//! Baptiste et al. (2001), "Constraint-Based Scheduling"

mod search;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::time::Instant;

use crate::compiler::{CompiledProblem, JobSet};
use crate::config::SchedulerConfig;
use crate::scheduler::{Ledger, ObjectiveKey};
use search::{Incumbent, Search, Stop};

/// Result of an optimizer run.
#[derive(Debug, Clone, Default)]
pub struct CpOutcome {
    /// Chosen slot per job (`None` for jobs without candidates), or `None`
    /// when no complete assignment was found.
    pub placements: Option<Vec<Option<usize>>>,
    /// The search proved the returned solution optimal.
    pub optimal: bool,
    /// Search nodes explored.
    pub nodes: u64,
    /// Restarts performed after the first pass.
    pub restarts: u32,
    /// Key of the returned solution.
    pub objective: Option<ObjectiveKey>,
}

impl CpOutcome {
    /// Whether a complete assignment was found.
    pub fn is_solution_found(&self) -> bool {
        self.placements.is_some()
    }
}

/// Branch-and-bound scheduler with seeded restarts.
///
/// # Example
/// ```
/// use chrono::NaiveTime;
/// use u_tournament::compiler::CompiledProblem;
/// use u_tournament::config::SchedulerConfig;
/// use u_tournament::cp::CpScheduler;
/// use u_tournament::models::{ConstraintSet, Court, Match, MatchId, Phase, Team};
///
/// let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
/// let six = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
/// let teams = vec![Team::new("Ants", "A", 1), Team::new("Bees", "A", 2)];
/// let courts = vec![Court::daily("C1", 1, nine, six)];
/// let matches = vec![Match::between(
///     MatchId::from_raw("POOL-A-R1-M1"),
///     Phase::Pool("A".into()),
///     1,
///     "Ants",
///     "Bees",
/// )];
///
/// let problem = CompiledProblem::compile(&teams, &courts, &ConstraintSet::default());
/// let jobs = problem.jobs(&matches);
/// let outcome = CpScheduler::new(SchedulerConfig::default()).solve(&problem, &jobs);
/// assert!(outcome.optimal);
/// assert_eq!(outcome.objective.unwrap().last_end, 10 * 60);
/// ```
#[derive(Debug, Clone)]
pub struct CpScheduler {
    config: SchedulerConfig,
}

impl CpScheduler {
    /// Creates a scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Searches for the best assignment of every job that has candidates.
    pub fn solve(&self, problem: &CompiledProblem, set: &JobSet) -> CpOutcome {
        let started = Instant::now();
        let deadline = started + self.config.time_budget();

        let mut order: Vec<usize> = (0..set.jobs.len())
            .filter(|&j| !set.jobs[j].candidates.is_empty())
            .collect();
        order.sort_by_key(|&j| (set.jobs[j].candidates.len(), j));

        let mut suffix_end = vec![i64::MIN; order.len() + 1];
        for depth in (0..order.len()).rev() {
            let job = &set.jobs[order[depth]];
            let earliest = job
                .candidates
                .first()
                .map_or(i64::MIN, |&s| problem.slots[s].start + job.duration);
            suffix_end[depth] = suffix_end[depth + 1].max(earliest);
        }

        let mut best: Option<Incumbent> = None;
        let mut outcome = CpOutcome::default();
        let mut allowance = self.config.restart_nodes.max(1);

        loop {
            let remaining = self.config.node_limit.saturating_sub(outcome.nodes);
            let cap = allowance.min(remaining);
            let mut pass = Search::new(
                problem,
                &set.jobs,
                &order,
                &suffix_end,
                Ledger::new(problem, set.team_names.len()),
                cap,
                deadline,
            );
            if outcome.restarts > 0 {
                let seed = self.config.seed.wrapping_add(u64::from(outcome.restarts));
                pass.shuffle_ties(&mut SmallRng::seed_from_u64(seed));
            }

            let stop = pass.run(&mut best);
            outcome.nodes += pass.nodes;

            match stop {
                Stop::Exhausted => {
                    outcome.optimal = true;
                    break;
                }
                Stop::Deadline => break,
                Stop::NodeCap if outcome.nodes >= self.config.node_limit => break,
                Stop::NodeCap => {
                    outcome.restarts += 1;
                    allowance = allowance.saturating_mul(2);
                    debug!(
                        "restart {} after {} nodes, incumbent {:?}",
                        outcome.restarts,
                        outcome.nodes,
                        best.as_ref().map(|b| b.key)
                    );
                }
            }
        }

        if let Some(incumbent) = best {
            let mut placements = vec![None; set.jobs.len()];
            for (depth, &slot) in incumbent.slots.iter().enumerate() {
                placements[order[depth]] = Some(slot);
            }
            outcome.placements = Some(placements);
            outcome.objective = Some(incumbent.key);
        }

        info!(
            "optimizer: {} jobs, solution {}, optimal {}, {} nodes, {} restarts in {:?}",
            order.len(),
            outcome.is_solution_found(),
            outcome.optimal,
            outcome.nodes,
            outcome.restarts,
            started.elapsed()
        );
        outcome
    }
}
