//! Scheduling runs, the greedy fallback, and KPI evaluation.
//!
//! [`run_schedule`] compiles the declarations, runs the optimizer within its
//! budget, and falls back to the [`GreedyScheduler`] when the optimizer finds
//! no complete assignment. Either way the caller gets a [`Schedule`] plus a
//! [`RunSummary`]; a failed optimizer run is never an error.
//!
//! # KPI
//!
//! [`ScheduleKpi`] computes makespan, minimum rest, near-consecutive pairs and
//! court utilization for any schedule.

mod greedy;
mod kpi;
mod ledger;

pub use greedy::{GreedyOutcome, GreedyScheduler};
pub use kpi::{ObjectiveKey, ScheduleKpi};
pub use ledger::Ledger;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::compiler::{CompiledProblem, Job, JobSet};
use crate::config::SchedulerConfig;
use crate::cp::CpScheduler;
use crate::error::ConfigurationError;
use crate::models::{
    Assignment, ConstraintSet, Court, HardConstraint, Match, Schedule, Team, TeamRule,
};

/// Input container for a scheduling run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Entered teams.
    pub teams: Vec<Team>,
    /// Available courts.
    pub courts: Vec<Court>,
    /// Constraint declarations.
    pub constraints: ConstraintSet,
    /// Matches to place.
    pub matches: Vec<Match>,
}

impl ScheduleRequest {
    /// Creates a request with default constraints.
    pub fn new(teams: Vec<Team>, courts: Vec<Court>, matches: Vec<Match>) -> Self {
        Self {
            teams,
            courts,
            constraints: ConstraintSet::default(),
            matches,
        }
    }

    /// Sets the constraint declarations.
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Which scheduler produced a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Branch-and-bound optimizer.
    Optimizer,
    /// Greedy fallback.
    Fallback,
}

/// Structured outcome of a scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scheduler that produced the result.
    pub strategy: Strategy,
    /// Placed matches.
    pub scheduled: usize,
    /// Matches left off the courts.
    pub unscheduled: usize,
    /// Reason of the first unscheduled match when nothing could be placed.
    pub first_unmet: Option<HardConstraint>,
    /// The optimizer proved its solution optimal.
    pub optimal: bool,
    /// Optimizer search nodes (0 when it did not run).
    pub nodes: u64,
    /// First start to last end (minutes).
    pub makespan: i64,
    /// Latest end on the tournament axis.
    pub last_end: Option<i64>,
    /// Smallest rest gap of any team.
    pub min_rest: Option<i64>,
    /// Near-consecutive pairs.
    pub near_consecutive: u32,
    /// Configuration problems met while compiling (excluded court-days,
    /// dropped rules, replaced values).
    pub issues: Vec<ConfigurationError>,
    /// Team rules no slot satisfied; those teams were scheduled freely.
    pub unconstrained: Vec<TeamRule>,
}

/// A schedule and the summary of the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRun {
    /// The schedule.
    pub schedule: Schedule,
    /// Run summary.
    pub summary: RunSummary,
}

/// Schedules a request.
///
/// # Example
/// ```
/// use chrono::NaiveTime;
/// use u_tournament::config::SchedulerConfig;
/// use u_tournament::models::{Court, Match, MatchId, Phase, Team};
/// use u_tournament::scheduler::{run_schedule, ScheduleRequest, Strategy};
///
/// let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
/// let six = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
/// let request = ScheduleRequest::new(
///     vec![Team::new("Ants", "A", 1), Team::new("Bees", "A", 2)],
///     vec![Court::daily("C1", 1, nine, six)],
///     vec![Match::between(
///         MatchId::from_raw("POOL-A-R1-M1"),
///         Phase::Pool("A".into()),
///         1,
///         "Ants",
///         "Bees",
///     )],
/// );
///
/// let run = run_schedule(&request, &SchedulerConfig::default());
/// assert_eq!(run.summary.strategy, Strategy::Optimizer);
/// assert_eq!(run.schedule.assignment_count(), 1);
/// ```
pub fn run_schedule(request: &ScheduleRequest, config: &SchedulerConfig) -> ScheduleRun {
    let problem = CompiledProblem::compile(&request.teams, &request.courts, &request.constraints);
    let set = problem.jobs(&request.matches);

    let mut strategy = Strategy::Fallback;
    let mut optimal = false;
    let mut nodes = 0;
    let mut placements = None;

    if config.use_optimizer {
        let outcome = CpScheduler::new(config.clone()).solve(&problem, &set);
        nodes = outcome.nodes;
        if let Some(found) = outcome.placements {
            strategy = Strategy::Optimizer;
            optimal = outcome.optimal;
            placements = Some(found);
        } else {
            info!("optimizer found no complete schedule, running greedy fallback");
        }
    }

    let mut schedule = Schedule::new();
    for rejected in &set.rejected {
        schedule.add_unscheduled(rejected.match_id.clone(), rejected.reason);
    }

    match placements {
        Some(found) => {
            for (job, slot) in set.jobs.iter().zip(found) {
                match slot {
                    Some(slot) => schedule.add_assignment(assignment(&problem, &set, job, slot)),
                    None => schedule.add_unscheduled(
                        job.match_id.clone(),
                        job.blocked.unwrap_or(HardConstraint::CourtWindow),
                    ),
                }
            }
        }
        None => {
            let greedy = GreedyScheduler::new()
                .with_tolerance(config.makespan_tolerance_min)
                .schedule(&problem, &set, &request.matches);
            for (job, slot) in set.jobs.iter().zip(greedy.placements) {
                if let Some(slot) = slot {
                    schedule.add_assignment(assignment(&problem, &set, job, slot));
                }
            }
            schedule.unscheduled.extend(greedy.unscheduled);
        }
    }

    schedule.assignments.sort_by_key(|a| (a.start, a.court.clone()));
    for u in &schedule.unscheduled {
        warn!("{} unscheduled: {}", u.match_id, u.reason);
    }

    let kpi = ScheduleKpi::calculate(&schedule, problem.near_threshold);
    let first_unmet = if schedule.assignments.is_empty() {
        schedule.unscheduled.first().map(|u| u.reason)
    } else {
        None
    };

    let summary = RunSummary {
        strategy,
        scheduled: kpi.scheduled,
        unscheduled: kpi.unscheduled,
        first_unmet,
        optimal,
        nodes,
        makespan: kpi.makespan,
        last_end: kpi.last_end,
        min_rest: kpi.min_rest,
        near_consecutive: kpi.near_consecutive,
        issues: problem.issues.clone(),
        unconstrained: problem.unconstrained.clone(),
    };
    info!(
        "schedule run: {:?}, {} scheduled, {} unscheduled, makespan {} min",
        summary.strategy, summary.scheduled, summary.unscheduled, summary.makespan
    );

    ScheduleRun { schedule, summary }
}

fn assignment(
    problem: &CompiledProblem,
    set: &JobSet,
    job: &Job,
    slot: usize,
) -> Assignment {
    let s = problem.slots[slot];
    let court_day = &problem.grid.court_days[s.court_day];
    Assignment {
        match_id: job.match_id.clone(),
        teams: job.teams.map(|t| set.team_names[t].clone()),
        court: court_day.court.clone(),
        day: court_day.day,
        slot: s.index,
        start: s.start,
        end: s.start + job.duration,
    }
}
