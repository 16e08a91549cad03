//! Context for dispatching rule evaluation.

use std::collections::{HashMap, HashSet};

use crate::models::{Match, MatchId};

/// Facts about the whole match list that rules may consult.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    /// Position of each match in the input list.
    pub declaration: HashMap<MatchId, usize>,
    /// Number of matches each team plays in this run.
    pub team_load: HashMap<String, usize>,
    /// Teams with an active play window.
    pub constrained_teams: HashSet<String>,
}

impl DispatchContext {
    /// Builds the context for a match list.
    pub fn for_matches(matches: &[Match]) -> Self {
        let mut context = Self::default();
        for (position, m) in matches.iter().enumerate() {
            context.declaration.entry(m.id.clone()).or_insert(position);
            if let Some(teams) = m.teams() {
                for team in teams {
                    *context.team_load.entry(team.to_string()).or_insert(0) += 1;
                }
            }
        }
        context
    }

    /// Marks a team as having a play window.
    pub fn with_constrained_team(mut self, team: impl Into<String>) -> Self {
        self.constrained_teams.insert(team.into());
        self
    }

    /// Declaration position of a match (`usize::MAX` if unknown).
    pub fn position(&self, id: &MatchId) -> usize {
        self.declaration.get(id).copied().unwrap_or(usize::MAX)
    }

    /// Matches played by a team.
    pub fn load(&self, team: &str) -> usize {
        self.team_load.get(team).copied().unwrap_or(0)
    }
}
