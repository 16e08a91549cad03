//! Bracket progression.
//!
//! Results enter through [`Bracket::record`]. A node accepts a result only
//! once both participants are concrete teams; the winner and loser are then
//! written into the downstream slots named by the node's routes, and any
//! node that becomes decidable without play (a bye) is advanced in the same
//! call. Rejected calls leave the bracket exactly as it was.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::BracketStateError;
use crate::models::{Match, MatchId, Participant, Phase};
use crate::results::CompletedResult;

use super::{Bracket, BracketFormat, Entrant, NodeState, Route, SlotSource};

/// Effect of a recorded result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// The node that took the result.
    pub node: MatchId,
    /// The node was already completed; only its score was replaced.
    pub replaced: bool,
    /// Nodes that became ready.
    pub ready: Vec<MatchId>,
    /// The bracket reset was activated by this result.
    pub reset_activated: bool,
    /// Champion, once decided.
    pub champion: Option<String>,
}

impl Bracket {
    /// Moves a ready node to in-progress.
    pub fn start(&mut self, id: &MatchId) -> Result<(), BracketStateError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| BracketStateError::UnknownNode(id.clone()))?;
        if self.nodes[idx].state != NodeState::Ready {
            return Err(reject(self.not_ready(idx)));
        }
        self.nodes[idx].state = NodeState::InProgress;
        debug!("{id} started");
        Ok(())
    }

    /// Records the result of node `id`.
    ///
    /// A node that is already completed keeps its winner: the same winner
    /// replaces the stored score without propagating again, a different
    /// winner is refused with [`BracketStateError::PropagationConflict`].
    pub fn record(
        &mut self,
        id: &MatchId,
        result: &CompletedResult,
    ) -> Result<Progress, BracketStateError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| reject(BracketStateError::UnknownNode(id.clone())))?;

        let node = &self.nodes[idx];
        if !matches!(
            node.state,
            NodeState::Ready | NodeState::InProgress | NodeState::Completed
        ) {
            return Err(reject(self.not_ready(idx)));
        }
        if result.winner == result.loser {
            return Err(reject(BracketStateError::SameTeam {
                id: id.clone(),
                team: result.winner.clone(),
            }));
        }
        let Some(winner_slot) = node.slot_of(&result.winner) else {
            return Err(reject(BracketStateError::NotAParticipant {
                id: id.clone(),
                team: result.winner.clone(),
            }));
        };
        if node.slot_of(&result.loser).is_none() {
            return Err(reject(BracketStateError::NotAParticipant {
                id: id.clone(),
                team: result.loser.clone(),
            }));
        }

        if node.state == NodeState::Completed {
            if node.winner != Some(winner_slot) {
                return Err(reject(BracketStateError::PropagationConflict {
                    id: id.clone(),
                    recorded: node.winning_team().unwrap_or_default().to_string(),
                    submitted: result.winner.clone(),
                }));
            }
            self.nodes[idx].result = Some(result.clone());
            debug!("{id} result replaced, winner unchanged");
            return Ok(Progress {
                node: id.clone(),
                replaced: true,
                ready: Vec::new(),
                reset_activated: false,
                champion: self.champion(),
            });
        }

        let ready_before: HashSet<MatchId> = self.in_state(NodeState::Ready).into_iter().cloned().collect();

        let node = &mut self.nodes[idx];
        node.state = NodeState::Completed;
        node.winner = Some(winner_slot);
        node.result = Some(result.clone());
        let winner_to = node.winner_to.clone();
        let loser_to = node.loser_to.clone();

        let mut reset_activated = false;
        if self.grand_final.as_ref() == Some(id) {
            reset_activated = self.resolve_grand_final(winner_slot, result);
        } else {
            self.deliver(winner_to, Entrant::Team(result.winner.clone()));
            self.deliver(loser_to, Entrant::Team(result.loser.clone()));
        }
        self.settle();

        let ready = self
            .in_state(NodeState::Ready)
            .into_iter()
            .filter(|r| !ready_before.contains(*r) && *r != id)
            .cloned()
            .collect();
        let champion = self.champion();
        if let Some(champion) = &champion {
            info!("bracket decided: champion {champion}");
        }

        Ok(Progress {
            node: id.clone(),
            replaced: false,
            ready,
            reset_activated,
            champion,
        })
    }

    /// Activates the reset when the losers-bracket finalist won.
    fn resolve_grand_final(&mut self, winner_slot: usize, result: &CompletedResult) -> bool {
        let Some(reset_idx) = self.reset.as_ref().and_then(|r| self.index_of(r)) else {
            return false;
        };
        let reset = &mut self.nodes[reset_idx];
        if winner_slot == 1 {
            reset.slots[0].entrant = Entrant::Team(result.winner.clone());
            reset.slots[1].entrant = Entrant::Team(result.loser.clone());
            reset.state = NodeState::Ready;
            self.terminal = reset.id.clone();
            info!("grand final won from the losers bracket, {} activated", reset.id);
            true
        } else {
            reset.state = NodeState::Inactive;
            false
        }
    }

    fn deliver(&mut self, route: Option<Route>, entrant: Entrant) {
        let Some(route) = route else {
            return;
        };
        if let Some(t) = self.index_of(&route.target) {
            self.nodes[t].slots[route.slot].entrant = entrant;
        }
    }

    /// Re-evaluates pending nodes in layout order, advancing byes.
    pub(crate) fn settle(&mut self) {
        for idx in 0..self.nodes.len() {
            let node = &self.nodes[idx];
            if node.state != NodeState::Pending || node.conditional {
                continue;
            }

            let a = node.slots[0].entrant.clone();
            let b = node.slots[1].entrant.clone();
            let winner_to = node.winner_to.clone();
            let loser_to = node.loser_to.clone();

            match (&a, &b) {
                (Entrant::Team(_), Entrant::Team(_)) => {
                    self.nodes[idx].state = NodeState::Ready;
                }
                (Entrant::Team(_), Entrant::Empty) | (Entrant::Empty, Entrant::Team(_)) => {
                    let slot = usize::from(a == Entrant::Empty);
                    let team = if slot == 0 { a.clone() } else { b.clone() };
                    self.nodes[idx].state = NodeState::Bye;
                    self.nodes[idx].winner = Some(slot);
                    debug!("{} bye, {:?} advances", self.nodes[idx].id, team);
                    self.deliver(winner_to, team);
                    self.deliver(loser_to, Entrant::Empty);
                }
                (Entrant::Empty, Entrant::Empty) => {
                    self.nodes[idx].state = NodeState::Bye;
                    self.deliver(winner_to, Entrant::Empty);
                    self.deliver(loser_to, Entrant::Empty);
                }
                _ => {}
            }
        }
    }

    /// Champion once the terminal node is completed.
    pub fn champion(&self) -> Option<String> {
        let node = self.node(&self.terminal)?;
        match node.state {
            NodeState::Completed => node.winning_team().map(str::to_string),
            _ => None,
        }
    }

    /// Played nodes `team` lost.
    pub fn losses(&self, team: &str) -> u32 {
        self.nodes
            .iter()
            .filter(|n| n.losing_team() == Some(team))
            .count() as u32
    }

    /// Whether `team` is out of the bracket.
    pub fn is_eliminated(&self, team: &str) -> bool {
        let limit = match self.format {
            BracketFormat::SingleElimination => 1,
            BracketFormat::DoubleElimination => 2,
        };
        self.losses(team) >= limit
    }

    /// Display label of slot `slot` of node `id`.
    ///
    /// Concrete teams render as their name, empty slots as `Bye`, unresolved
    /// slots as `#<position> <pool>` or `Winner of <id>` / `Loser of <id>`.
    pub fn label(&self, id: &MatchId, slot: usize) -> Option<String> {
        let s = self.node(id)?.slots.get(slot)?;
        Some(match &s.entrant {
            Entrant::Team(team) => team.clone(),
            Entrant::Empty => "Bye".to_string(),
            Entrant::Unresolved => match &s.source {
                SlotSource::Seed(seed) => self
                    .seeds
                    .get((*seed as usize).saturating_sub(1))
                    .map_or_else(|| format!("Seed {seed}"), |e| e.label()),
                SlotSource::WinnerOf(feeder) => format!("Winner of {feeder}"),
                SlotSource::LoserOf(feeder) => format!("Loser of {feeder}"),
            },
        })
    }

    /// Bracket matches to be played, with placeholders where participants
    /// are still unknown.
    ///
    /// Byes, inactive nodes and a reset that has not been activated are
    /// left out.
    pub fn fixtures(&self) -> Vec<Match> {
        self.nodes
            .iter()
            .filter(|n| !matches!(n.state, NodeState::Bye | NodeState::Inactive))
            .filter(|n| !n.has_empty_slot())
            .filter(|n| !(n.conditional && n.state == NodeState::Pending))
            .map(|n| {
                let side = |slot: usize| match n.slots[slot].entrant.team() {
                    Some(team) => Participant::Team(team.to_string()),
                    None => Participant::Placeholder(
                        self.label(&n.id, slot).unwrap_or_default(),
                    ),
                };
                Match::new(n.id.clone(), Phase::Bracket(n.side), n.round, side(0), side(1))
            })
            .collect()
    }

    /// Fills placeholder seeds from final pool standings.
    ///
    /// Either every unresolved seed is filled or nothing changes. Seeds that
    /// already name a team are left as they are. Returns how many seeds were
    /// filled.
    pub fn resolve_seeds(
        &mut self,
        standings: &BTreeMap<String, Vec<String>>,
    ) -> Result<usize, BracketStateError> {
        let mut filled = Vec::new();
        for (i, entry) in self.seeds.iter().enumerate() {
            if entry.team.is_some() {
                continue;
            }
            let team = standings
                .get(&entry.pool)
                .and_then(|order| order.get((entry.position as usize).saturating_sub(1)))
                .ok_or_else(|| {
                    reject(BracketStateError::MissingSeed {
                        pool: entry.pool.clone(),
                        position: entry.position,
                    })
                })?;
            filled.push((i, team.clone()));
        }

        let count = filled.len();
        for (i, team) in filled {
            self.seeds[i].team = Some(team);
        }
        self.fill_seed_slots();
        self.settle();
        info!("resolved {count} bracket seeds from standings");
        Ok(count)
    }
}

impl Bracket {
    /// Error for a node whose state does not allow play.
    fn not_ready(&self, idx: usize) -> BracketStateError {
        let node = &self.nodes[idx];
        if node.state == NodeState::Inactive && self.reset.as_ref() == Some(&node.id) {
            BracketStateError::ResetInactive(node.id.clone())
        } else {
            BracketStateError::NotReady {
                id: node.id.clone(),
                state: node.state,
            }
        }
    }
}

fn reject(err: BracketStateError) -> BracketStateError {
    warn!("bracket update rejected: {err}");
    err
}
