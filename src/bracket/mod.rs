//! Elimination brackets.
//!
//! A [`Bracket`] is a fixed graph of [`BracketNode`]s laid out once by
//! [`generate`]. Each node has two slots; a slot is filled from a seed or
//! from the winner or loser of a feeder node. Completing a node pushes its
//! winner and loser along the node's routes exactly once.
//!
//! # Node states
//!
//! ```text
//! Pending ──► Ready ──► InProgress ──► Completed
//!    │          └──────────────────────────┘ (record without start)
//!    ├──► Bye       (one or both slots empty, never played)
//!    └──► Inactive  (bracket reset not needed)
//! ```
//!
//! # Double elimination
//!
//! Losers of winners round 1 pair up in losers round 1. From then on each
//! pair of losers rounds first lets the survivors meet (minor round) and then
//! takes in the losers of the next winners round (major round). The winners
//! champion meets the losers champion in the grand final `GF-R1-M1`; the
//! reset `GF-R2-M1` is only played when the losers champion wins it.

mod generator;
mod progression;
mod seeding;

pub use generator::generate;
pub use progression::Progress;
pub use seeding::{bracket_size, bye_count, seed_positions, seeds_from_plan, seeds_from_standings, SeedEntry};

use serde::{Deserialize, Serialize};

use crate::models::{BracketSide, MatchId};

/// Elimination format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketFormat {
    /// One loss eliminates.
    SingleElimination,
    /// Two losses eliminate; winners and losers brackets plus grand final.
    DoubleElimination,
}

/// Lifecycle of a bracket node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// At least one participant unknown.
    Pending,
    /// Both participants known, not started.
    Ready,
    /// Being played.
    InProgress,
    /// Winner recorded.
    Completed,
    /// Auto-advanced, never played.
    Bye,
    /// Conditional node that will not be played.
    Inactive,
}

/// Where a slot's participant comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotSource {
    /// A seed number (1-based).
    Seed(u32),
    /// The winner of a feeder node.
    WinnerOf(MatchId),
    /// The loser of a feeder node.
    LoserOf(MatchId),
}

/// What currently occupies a slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Entrant {
    /// Not known yet.
    #[default]
    Unresolved,
    /// A concrete team.
    Team(String),
    /// Nobody will ever arrive (bye).
    Empty,
}

impl Entrant {
    /// Team name, if any.
    pub fn team(&self) -> Option<&str> {
        match self {
            Entrant::Team(name) => Some(name),
            _ => None,
        }
    }
}

/// One side of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    /// Origin of the participant.
    pub source: SlotSource,
    /// Current occupant.
    pub entrant: Entrant,
}

impl BracketSlot {
    fn new(source: SlotSource) -> Self {
        Self {
            source,
            entrant: Entrant::Unresolved,
        }
    }
}

/// Downstream destination of a winner or loser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Target node.
    pub target: MatchId,
    /// Slot index in the target (0 or 1).
    pub slot: usize,
}

/// A bracket match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketNode {
    /// Canonical id.
    pub id: MatchId,
    /// Bracket side.
    pub side: BracketSide,
    /// Round within the side (1-based).
    pub round: u32,
    /// Position within the round (1-based).
    pub position: u32,
    /// Both participants.
    pub slots: [BracketSlot; 2],
    /// Current state.
    pub state: NodeState,
    /// Index of the winning slot.
    pub winner: Option<usize>,
    /// Where the winner goes.
    pub winner_to: Option<Route>,
    /// Where the loser goes (double elimination).
    pub loser_to: Option<Route>,
    /// Played only when activated (bracket reset).
    pub conditional: bool,
    /// Recorded result.
    pub result: Option<crate::results::CompletedResult>,
}

impl BracketNode {
    /// Team in slot `index`.
    pub fn team(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|s| s.entrant.team())
    }

    /// Winning team, once decided.
    pub fn winning_team(&self) -> Option<&str> {
        self.winner.and_then(|w| self.team(w))
    }

    /// Losing team of a played node.
    pub fn losing_team(&self) -> Option<&str> {
        match self.state {
            NodeState::Completed => self.winner.and_then(|w| self.team(1 - w)),
            _ => None,
        }
    }

    /// Slot index of `team`.
    pub fn slot_of(&self, team: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.entrant.team() == Some(team))
    }

    /// Whether either slot is empty.
    pub fn has_empty_slot(&self) -> bool {
        self.slots.iter().any(|s| s.entrant == Entrant::Empty)
    }
}

/// A generated bracket and its progression state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    /// Format.
    pub format: BracketFormat,
    /// Slots in winners round 1 (power of two).
    pub size: u32,
    /// Empty first-round slots.
    pub byes: u32,
    /// Seeds in seed order.
    pub seeds: Vec<SeedEntry>,
    /// Nodes, feeders always before the nodes they feed.
    pub nodes: Vec<BracketNode>,
    /// Grand final (double elimination).
    pub grand_final: Option<MatchId>,
    /// Conditional reset (double elimination).
    pub reset: Option<MatchId>,
    /// Node whose winner is the champion.
    pub terminal: MatchId,
}

impl Bracket {
    /// Node by id.
    pub fn node(&self, id: &MatchId) -> Option<&BracketNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub(crate) fn index_of(&self, id: &MatchId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    /// Nodes of one side, in layout order.
    pub fn side(&self, side: BracketSide) -> impl Iterator<Item = &BracketNode> {
        self.nodes.iter().filter(move |n| n.side == side)
    }

    /// Number of rounds in `side`.
    pub fn rounds(&self, side: BracketSide) -> u32 {
        self.side(side).map(|n| n.round).max().unwrap_or(0)
    }

    /// Nodes currently in `state`.
    pub fn in_state(&self, state: NodeState) -> Vec<&MatchId> {
        self.nodes
            .iter()
            .filter(|n| n.state == state)
            .map(|n| &n.id)
            .collect()
    }

    /// Whether every node is finished (completed, bye or inactive).
    pub fn is_finished(&self) -> bool {
        self.nodes.iter().all(|n| {
            matches!(
                n.state,
                NodeState::Completed | NodeState::Bye | NodeState::Inactive
            )
        })
    }
}
