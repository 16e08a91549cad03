//! Team model.

use serde::{Deserialize, Serialize};

/// A team entered in the tournament.
///
/// Immutable input: the pool it plays in and its seed within that pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team name.
    pub name: String,
    /// Pool the team plays its round-robin in.
    pub pool: String,
    /// Seed (1 = strongest).
    pub seed: u32,
}

impl Team {
    /// Creates a team.
    pub fn new(name: impl Into<String>, pool: impl Into<String>, seed: u32) -> Self {
        Self {
            name: name.into(),
            pool: pool.into(),
            seed,
        }
    }
}
