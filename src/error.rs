//! Error types.
//!
//! Configuration problems degrade locally: the offending court-day or rule
//! is excluded and reported, the run continues. Bracket state conflicts are
//! rejected outright and leave the bracket untouched. Unschedulable matches
//! and legacy-key lookups are not errors at all; they are reported as data
//! ([`crate::models::Unscheduled`], [`crate::results::IdentityResolution::Legacy`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bracket::NodeState;
use crate::models::MatchId;

/// Invalid court, slot, or constraint declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationError {
    /// A court-day window resolves to a non-positive length.
    #[error("court '{court}' day {day}: window length {length_min} min is not positive")]
    EmptyCourtDay {
        court: String,
        day: u32,
        length_min: i64,
    },

    /// Slot granularity must be positive.
    #[error("slot granularity must be positive, got {0} min")]
    InvalidGranularity(i64),

    /// Match duration must be positive.
    #[error("match duration must be positive, got {0} min")]
    InvalidDuration(i64),

    /// Breaks cannot be negative.
    #[error("break must not be negative, got {0} min")]
    NegativeBreak(i64),

    /// A team rule names a team that is not entered.
    #[error("team rule references unknown team '{0}'")]
    UnknownTeam(String),

    /// A team window admits no slot on any court.
    #[error("window for team '{0}' admits no slot on any court")]
    UnsatisfiableWindow(String),

    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Rejected bracket operation. Prior bracket state is retained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BracketStateError {
    /// No node carries this id.
    #[error("unknown bracket node {0}")]
    UnknownNode(MatchId),

    /// The node cannot accept this operation in its current state.
    #[error("node {id} is {state:?}")]
    NotReady { id: MatchId, state: NodeState },

    /// The submitted team does not play in this node.
    #[error("'{team}' is not a participant of {id}")]
    NotAParticipant { id: MatchId, team: String },

    /// Winner and loser of a submitted result are the same team.
    #[error("winner and loser of {id} are both '{team}'")]
    SameTeam { id: MatchId, team: String },

    /// The grand-final reset was not activated, so it is never played.
    #[error("bracket reset {0} is not active")]
    ResetInactive(MatchId),

    /// A completed node was resubmitted with a different winner.
    #[error("{id} already completed with winner '{recorded}', refusing '{submitted}'")]
    PropagationConflict {
        id: MatchId,
        recorded: String,
        submitted: String,
    },

    /// Fewer than two seeds.
    #[error("a bracket needs at least two teams, got {0}")]
    TooFewTeams(usize),

    /// Standings do not provide a team for a seeded position.
    #[error("standings have no team at position {position} of pool '{pool}'")]
    MissingSeed { pool: String, position: u32 },
}

/// Malformed result submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    /// Winner and loser are the same team.
    #[error("winner and loser are both '{0}'")]
    SameTeam(String),

    /// Sets won are level, so there is no winner.
    #[error("sets are tied {0}-{1}")]
    TiedSets(u32, u32),

    /// The result names teams that do not play this match.
    #[error("result teams do not match the participants of {0}")]
    WrongTeams(MatchId),
}

/// Crate-level error returned by tournament operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Bracket state error.
    #[error("bracket state error: {0}")]
    BracketState(#[from] BracketStateError),

    /// Result error.
    #[error("result error: {0}")]
    Result(#[from] ResultError),

    /// No match with this id exists in the tournament.
    #[error("unknown match {0}")]
    UnknownMatch(MatchId),

    /// The operation needs a bracket that has not been generated.
    #[error("no bracket has been generated")]
    NoBracket,

    /// No tournament with this id is registered.
    #[error("tournament '{0}' not found")]
    UnknownTournament(String),
}
