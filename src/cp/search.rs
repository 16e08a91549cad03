//! Depth-first branch-and-bound over slot choices.

use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::time::Instant;

use crate::compiler::{CompiledProblem, Job};
use crate::scheduler::{Ledger, ObjectiveKey};

/// Why a search pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Stop {
    /// The whole tree was explored.
    Exhausted,
    /// The pass used up its node allowance.
    NodeCap,
    /// The wall-clock deadline passed.
    Deadline,
}

/// Best complete assignment found so far.
#[derive(Debug, Clone)]
pub(super) struct Incumbent {
    pub key: ObjectiveKey,
    /// Chosen slot per entry of the branching order.
    pub slots: Vec<usize>,
}

/// One search pass (one restart).
pub(super) struct Search<'a> {
    problem: &'a CompiledProblem,
    jobs: &'a [Job],
    order: &'a [usize],
    /// Lower bound on the last end of the jobs at `order[depth..]`.
    suffix_end: &'a [i64],
    candidates: Vec<Vec<usize>>,
    ledger: Ledger,
    path: Vec<usize>,
    pub nodes: u64,
    node_cap: u64,
    deadline: Instant,
    stop: Option<Stop>,
}

impl<'a> Search<'a> {
    pub fn new(
        problem: &'a CompiledProblem,
        jobs: &'a [Job],
        order: &'a [usize],
        suffix_end: &'a [i64],
        ledger: Ledger,
        node_cap: u64,
        deadline: Instant,
    ) -> Self {
        Self {
            problem,
            jobs,
            order,
            suffix_end,
            candidates: order.iter().map(|&j| jobs[j].candidates.clone()).collect(),
            ledger,
            path: Vec::with_capacity(order.len()),
            nodes: 0,
            node_cap,
            deadline,
            stop: None,
        }
    }

    /// Shuffles candidates that share a start time, keeping chronological
    /// order between different starts.
    pub fn shuffle_ties(&mut self, rng: &mut SmallRng) {
        let slots = &self.problem.slots;
        for list in &mut self.candidates {
            let mut from = 0;
            while from < list.len() {
                let start = slots[list[from]].start;
                let to = list[from..]
                    .iter()
                    .position(|&s| slots[s].start != start)
                    .map_or(list.len(), |p| from + p);
                list[from..to].shuffle(rng);
                from = to;
            }
        }
    }

    /// Runs the pass, improving `best` in place.
    pub fn run(&mut self, best: &mut Option<Incumbent>) -> Stop {
        let root = ObjectiveKey::empty(self.problem.opening());
        self.descend(0, root, best);
        self.stop.unwrap_or(Stop::Exhausted)
    }

    fn descend(&mut self, depth: usize, key: ObjectiveKey, best: &mut Option<Incumbent>) {
        if depth == self.order.len() {
            if best.as_ref().is_none_or(|b| key < b.key) {
                debug!(
                    "incumbent: last end {}, min rest {:?}, penalty {} after {} nodes",
                    key.last_end,
                    key.min_rest(),
                    key.penalty,
                    self.nodes
                );
                *best = Some(Incumbent {
                    key,
                    slots: self.path.clone(),
                });
            }
            return;
        }

        if let Some(b) = best {
            let bound = ObjectiveKey {
                last_end: key.last_end.max(self.suffix_end[depth]),
                ..key
            };
            if bound >= b.key {
                return;
            }
        }

        let jobs = self.jobs;
        let job = &jobs[self.order[depth]];
        for k in 0..self.candidates[depth].len() {
            if self.tick() {
                return;
            }

            let slot = self.candidates[depth][k];
            let end = self.problem.slots[slot].start + job.duration;
            if best.as_ref().is_some_and(|b| end > b.key.last_end) {
                // Candidates only get later from here
                break;
            }
            if self.ledger.check(self.problem, job, slot).is_err() {
                continue;
            }

            let rest = self.ledger.rest_gap(self.problem, job, slot);
            let penalty = if self.problem.avoid_consecutive {
                self.ledger.near_pairs(self.problem, job, slot)
            } else {
                0
            };
            let next = key.extend(end, rest, penalty);
            if best.as_ref().is_some_and(|b| next >= b.key) {
                continue;
            }

            self.ledger.place(self.problem, job, slot);
            self.path.push(slot);
            self.descend(depth + 1, next, best);
            self.path.pop();
            self.ledger.remove(self.problem, job, slot);

            if self.stop.is_some() {
                return;
            }
        }
    }

    /// Counts a node; true once the pass must stop.
    fn tick(&mut self) -> bool {
        if self.stop.is_some() {
            return true;
        }
        self.nodes += 1;
        if self.nodes >= self.node_cap {
            self.stop = Some(Stop::NodeCap);
        } else if self.nodes % 1024 == 0 && Instant::now() >= self.deadline {
            self.stop = Some(Stop::Deadline);
        }
        self.stop.is_some()
    }
}
