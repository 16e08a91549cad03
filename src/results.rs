//! Match results and identity unification.
//!
//! Every result is stored under the match's canonical [`MatchId`], the one
//! key both the schedule view and the bracket view use. Saving is
//! last-write-wins: a save replaces whatever the id held before, scores are
//! never merged.
//!
//! Results imported from older data may only exist under a legacy key (for
//! example a key built from team names). Registering an alias lets lookups
//! fall back to such a key; the hit is flagged as
//! [`IdentityResolution::Legacy`] so callers can migrate it.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::ResultError;
use crate::models::{Match, MatchId, Phase, Schedule};

/// Points of one set, from the winner's and the loser's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    /// Points of the match winner.
    pub winner: u32,
    /// Points of the match loser.
    pub loser: u32,
}

/// A finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedResult {
    /// Winning team.
    pub winner: String,
    /// Losing team.
    pub loser: String,
    /// Set scores, possibly empty (forfeit).
    pub sets: Vec<SetScore>,
}

impl CompletedResult {
    /// A result with explicit winner, loser and sets.
    pub fn new(
        winner: impl Into<String>,
        loser: impl Into<String>,
        sets: Vec<SetScore>,
    ) -> Result<Self, ResultError> {
        let winner = winner.into();
        let loser = loser.into();
        if winner == loser {
            return Err(ResultError::SameTeam(winner));
        }
        Ok(Self {
            winner,
            loser,
            sets,
        })
    }

    /// A result without sets.
    pub fn forfeit(
        winner: impl Into<String>,
        loser: impl Into<String>,
    ) -> Result<Self, ResultError> {
        Self::new(winner, loser, Vec::new())
    }

    /// Derives the winner from `(home, away)` set points.
    ///
    /// ```
    /// use u_tournament::results::CompletedResult;
    ///
    /// let r = CompletedResult::from_sets("Ants", "Bees", &[(25, 20), (18, 25), (15, 10)]).unwrap();
    /// assert_eq!(r.winner, "Ants");
    /// assert_eq!(r.sets_won(), (2, 1));
    /// ```
    pub fn from_sets(home: &str, away: &str, sets: &[(u32, u32)]) -> Result<Self, ResultError> {
        let home_sets = sets.iter().filter(|(h, a)| h > a).count() as u32;
        let away_sets = sets.iter().filter(|(h, a)| a > h).count() as u32;
        if home_sets == away_sets {
            return Err(ResultError::TiedSets(home_sets, away_sets));
        }

        let home_won = home_sets > away_sets;
        let scores = sets
            .iter()
            .map(|&(h, a)| {
                if home_won {
                    SetScore { winner: h, loser: a }
                } else {
                    SetScore { winner: a, loser: h }
                }
            })
            .collect();
        if home_won {
            Self::new(home, away, scores)
        } else {
            Self::new(away, home, scores)
        }
    }

    /// Sets won by (winner, loser).
    pub fn sets_won(&self) -> (u32, u32) {
        let w = self.sets.iter().filter(|s| s.winner > s.loser).count() as u32;
        let l = self.sets.iter().filter(|s| s.loser > s.winner).count() as u32;
        (w, l)
    }

    /// Total points of (winner, loser).
    pub fn points(&self) -> (u32, u32) {
        self.sets
            .iter()
            .fold((0, 0), |(w, l), s| (w + s.winner, l + s.loser))
    }

    /// Whether `team` played in this match.
    pub fn involves(&self, team: &str) -> bool {
        self.winner == team || self.loser == team
    }
}

/// State of a match result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    /// Not played yet.
    #[default]
    Pending,
    /// Played, with a winner.
    Completed(CompletedResult),
}

impl MatchResult {
    /// The completed result, if any.
    pub fn completed(&self) -> Option<&CompletedResult> {
        match self {
            MatchResult::Completed(r) => Some(r),
            MatchResult::Pending => None,
        }
    }
}

/// How a lookup found its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityResolution {
    /// Found under the canonical id.
    Canonical,
    /// Found only under a legacy key; should be migrated.
    Legacy {
        /// The legacy key that matched.
        key: String,
    },
}

/// A lookup hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<'a> {
    /// The stored result.
    pub result: &'a MatchResult,
    /// Where it was found.
    pub source: IdentityResolution,
}

/// Result storage keyed by canonical match id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultStore {
    canonical: BTreeMap<MatchId, MatchResult>,
    legacy: HashMap<String, MatchResult>,
    aliases: HashMap<MatchId, Vec<String>>,
}

impl ResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a result, replacing whatever the id held. Returns the
    /// replaced value.
    pub fn save(&mut self, id: MatchId, result: MatchResult) -> Option<MatchResult> {
        self.canonical.insert(id, result)
    }

    /// Imports a result kept under a legacy key.
    pub fn import_legacy(&mut self, key: impl Into<String>, result: MatchResult) {
        self.legacy.insert(key.into(), result);
    }

    /// Declares that `key` is an older name for `id`.
    pub fn register_alias(&mut self, id: MatchId, key: impl Into<String>) {
        let key = key.into();
        let keys = self.aliases.entry(id).or_default();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    /// Looks a result up by canonical id, falling back to legacy aliases.
    pub fn lookup(&self, id: &MatchId) -> Option<Resolved<'_>> {
        if let Some(result) = self.canonical.get(id) {
            return Some(Resolved {
                result,
                source: IdentityResolution::Canonical,
            });
        }

        let keys = self.aliases.get(id)?;
        keys.iter().find_map(|key| {
            self.legacy.get(key).map(|result| {
                warn!("result for {id} found only under legacy key '{key}'");
                Resolved {
                    result,
                    source: IdentityResolution::Legacy { key: key.clone() },
                }
            })
        })
    }

    /// Result for `id`, wherever it is stored.
    pub fn get(&self, id: &MatchId) -> Option<&MatchResult> {
        self.lookup(id).map(|r| r.result)
    }

    /// Moves aliased legacy results under their canonical ids.
    ///
    /// A canonical entry always wins over a legacy one. Returns the number of
    /// results moved.
    pub fn migrate(&mut self) -> usize {
        let mut moved = 0;
        for (id, keys) in &self.aliases {
            for key in keys {
                let Some(result) = self.legacy.remove(key) else {
                    continue;
                };
                if !self.canonical.contains_key(id) {
                    self.canonical.insert(id.clone(), result);
                    moved += 1;
                }
            }
        }
        moved
    }

    /// Completed results under canonical ids.
    pub fn completed(&self) -> impl Iterator<Item = (&MatchId, &CompletedResult)> {
        self.canonical
            .iter()
            .filter_map(|(id, r)| r.completed().map(|c| (id, c)))
    }

    /// Number of canonical entries.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Whether the store holds no canonical entry.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

/// A result joined with its match and schedule context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    /// Canonical id.
    pub match_id: MatchId,
    /// Phase.
    pub phase: Phase,
    /// Round.
    pub round: u32,
    /// Home participant (team name or placeholder label).
    pub home: String,
    /// Away participant.
    pub away: String,
    /// Assigned court, if scheduled.
    pub court: Option<String>,
    /// Start minute, if scheduled.
    pub start: Option<i64>,
    /// Stored result (pending when none).
    pub result: MatchResult,
    /// How the result was found; `None` when there is none.
    pub source: Option<IdentityResolution>,
}

/// Joins every match with its assignment and stored result.
pub fn enrich(matches: &[Match], schedule: &Schedule, store: &ResultStore) -> Vec<EnrichedResult> {
    matches
        .iter()
        .map(|m| {
            let assignment = schedule.assignment_for(&m.id);
            let resolved = store.lookup(&m.id);
            EnrichedResult {
                match_id: m.id.clone(),
                phase: m.phase.clone(),
                round: m.round,
                home: m.home.to_string(),
                away: m.away.to_string(),
                court: assignment.map(|a| a.court.clone()),
                start: assignment.map(|a| a.start),
                result: resolved
                    .as_ref()
                    .map(|r| r.result.clone())
                    .unwrap_or_default(),
                source: resolved.map(|r| r.source),
            }
        })
        .collect()
}
