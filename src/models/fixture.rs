//! Match model and canonical match identity.
//!
//! Every match carries one [`MatchId`], assigned once when the match is
//! generated (pool round-robin or bracket skeleton) from its phase, round,
//! and sequence number. The id is never recomputed from team names or from
//! the order matches happen to be stored in; results, schedule assignments,
//! and bracket nodes all refer to a match through it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical match identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Builds the canonical id for the `sequence`-th match of `round` in `phase`.
    ///
    /// ```
    /// use u_tournament::models::{BracketSide, MatchId, Phase};
    ///
    /// let id = MatchId::new(&Phase::Bracket(BracketSide::Winners), 1, 3);
    /// assert_eq!(id.as_str(), "WB-R1-M3");
    /// ```
    pub fn new(phase: &Phase, round: u32, sequence: u32) -> Self {
        Self(format!("{}-R{round}-M{sequence}", phase.code()))
    }

    /// Wraps an id issued by a collaborator.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Side of an elimination bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BracketSide {
    /// Winners bracket (the whole bracket in single elimination).
    Winners,
    /// Losers bracket (double elimination only).
    Losers,
    /// Grand final and its conditional reset.
    GrandFinal,
}

/// Tournament phase a match belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Round-robin play inside the named pool.
    Pool(String),
    /// Elimination bracket play.
    Bracket(BracketSide),
}

impl Phase {
    /// Short code used in canonical ids.
    pub fn code(&self) -> String {
        match self {
            Phase::Pool(pool) => format!("POOL-{pool}"),
            Phase::Bracket(BracketSide::Winners) => "WB".to_string(),
            Phase::Bracket(BracketSide::Losers) => "LB".to_string(),
            Phase::Bracket(BracketSide::GrandFinal) => "GF".to_string(),
        }
    }

    /// Whether this is pool play.
    pub fn is_pool(&self) -> bool {
        matches!(self, Phase::Pool(_))
    }

    /// Pool name for pool play.
    pub fn pool(&self) -> Option<&str> {
        match self {
            Phase::Pool(pool) => Some(pool),
            Phase::Bracket(_) => None,
        }
    }
}

/// One side of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Participant {
    /// A concrete team.
    Team(String),
    /// Not yet resolved (e.g. "#1 A", "Winner of WB-R1-M2").
    Placeholder(String),
}

impl Participant {
    /// Team name when resolved.
    pub fn team(&self) -> Option<&str> {
        match self {
            Participant::Team(name) => Some(name),
            Participant::Placeholder(_) => None,
        }
    }

    /// Whether this participant is a concrete team.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Participant::Team(_))
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::Team(name) | Participant::Placeholder(name) => f.write_str(name),
        }
    }
}

/// A match to be scheduled and played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Canonical identity.
    pub id: MatchId,
    /// Phase the match belongs to.
    pub phase: Phase,
    /// Round within the phase (1-indexed).
    pub round: u32,
    /// First participant.
    pub home: Participant,
    /// Second participant.
    pub away: Participant,
    /// Duration override (minutes). `None` = constraint set default.
    pub duration_min: Option<i64>,
}

impl Match {
    /// Creates a match.
    pub fn new(id: MatchId, phase: Phase, round: u32, home: Participant, away: Participant) -> Self {
        Self {
            id,
            phase,
            round,
            home,
            away,
            duration_min: None,
        }
    }

    /// Creates a match between two concrete teams.
    pub fn between(
        id: MatchId,
        phase: Phase,
        round: u32,
        home: impl Into<String>,
        away: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            phase,
            round,
            Participant::Team(home.into()),
            Participant::Team(away.into()),
        )
    }

    /// Overrides the duration.
    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration_min = Some(minutes);
        self
    }

    /// Both team names, when both participants are resolved.
    pub fn teams(&self) -> Option<[&str; 2]> {
        match (self.home.team(), self.away.team()) {
            (Some(h), Some(a)) => Some([h, a]),
            _ => None,
        }
    }

    /// Whether `team` plays in this match.
    pub fn involves(&self, team: &str) -> bool {
        self.home.team() == Some(team) || self.away.team() == Some(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_ids() {
        let pool = Phase::Pool("A".into());
        assert_eq!(MatchId::new(&pool, 2, 1).as_str(), "POOL-A-R2-M1");
        let losers = Phase::Bracket(BracketSide::Losers);
        assert_eq!(MatchId::new(&losers, 3, 2).to_string(), "LB-R3-M2");
        let gf = Phase::Bracket(BracketSide::GrandFinal);
        assert_eq!(MatchId::new(&gf, 2, 1).as_str(), "GF-R2-M1");
    }

    #[test]
    fn test_match_teams() {
        let m = Match::between(MatchId::from_raw("m1"), Phase::Pool("A".into()), 1, "Ants", "Bees");
        assert_eq!(m.teams(), Some(["Ants", "Bees"]));
        assert!(m.involves("Bees"));
        assert!(!m.involves("Cats"));
        assert_eq!(m.phase.pool(), Some("A"));
    }

    #[test]
    fn test_placeholder_has_no_teams() {
        let m = Match::new(
            MatchId::from_raw("WB-R2-M1"),
            Phase::Bracket(BracketSide::Winners),
            2,
            Participant::Team("Ants".into()),
            Participant::Placeholder("Winner of WB-R1-M2".into()),
        );
        assert!(m.teams().is_none());
        assert_eq!(m.away.to_string(), "Winner of WB-R1-M2");
    }

    #[test]
    fn test_match_id_serializes_as_string() {
        let id = MatchId::from_raw("WB-R1-M1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"WB-R1-M1\"");
    }
}
