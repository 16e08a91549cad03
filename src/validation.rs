//! Structural input checks.
//!
//! Run before scheduling or after loading a stored bracket. Detects:
//! - Duplicate team names, court names and match ids
//! - Matches referencing teams that are not entered
//! - A team drawn against itself
//! - Bracket slots fed by unknown nodes
//! - Feeder cycles in a bracket (DAG validation)
//! - A winner or loser routed to more than one slot
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::bracket::{Bracket, SlotSource};
use crate::models::{Court, Match, Team};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same name or id.
    DuplicateId,
    /// A match names a team that is not entered.
    UnknownTeam,
    /// Both sides of a match are the same team.
    SelfMatch,
    /// A slot is fed by a node that does not exist.
    InvalidFeeder,
    /// The feeder graph contains a cycle.
    CyclicDependency,
    /// One outcome of a node feeds more than one slot.
    MultipleTargets,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates teams, courts and matches.
///
/// Placeholder participants are not checked against the team list.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(teams: &[Team], courts: &[Court], matches: &[Match]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut team_names = HashSet::new();
    for t in teams {
        if !team_names.insert(t.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate team: {}", t.name),
            ));
        }
    }

    let mut court_names = HashSet::new();
    for c in courts {
        if !court_names.insert(c.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate court: {}", c.name),
            ));
        }
    }

    let mut match_ids = HashSet::new();
    for m in matches {
        if !match_ids.insert(&m.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate match ID: {}", m.id),
            ));
        }

        for team in [m.home.team(), m.away.team()].into_iter().flatten() {
            if !team_names.contains(team) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownTeam,
                    format!("Match '{}' references unknown team '{team}'", m.id),
                ));
            }
        }

        if let Some([home, away]) = m.teams() {
            if home == away {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SelfMatch,
                    format!("Match '{}' pits '{home}' against itself", m.id),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates the feeder graph of a bracket.
pub fn validate_bracket(bracket: &Bracket) -> ValidationResult {
    let mut errors = Vec::new();
    let ids: HashSet<&str> = bracket.nodes.iter().map(|n| n.id.as_str()).collect();

    // feeder → nodes it feeds
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut outlets: HashSet<(&str, bool)> = HashSet::new();

    for node in &bracket.nodes {
        for slot in &node.slots {
            let (feeder, winner) = match &slot.source {
                SlotSource::Seed(_) => continue,
                SlotSource::WinnerOf(f) => (f.as_str(), true),
                SlotSource::LoserOf(f) => (f.as_str(), false),
            };
            if !ids.contains(feeder) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidFeeder,
                    format!("Node '{}' is fed by unknown node '{feeder}'", node.id),
                ));
                continue;
            }
            if !outlets.insert((feeder, winner)) {
                let side = if winner { "winner" } else { "loser" };
                errors.push(ValidationError::new(
                    ValidationErrorKind::MultipleTargets,
                    format!("The {side} of '{feeder}' feeds more than one slot"),
                ));
            }
            adj.entry(feeder).or_default().push(node.id.as_str());
        }
    }

    if let Some(cycle_err) = detect_cycles(&ids, &adj) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the feeder graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
fn detect_cycles<'a>(
    all_ids: &HashSet<&'a str>,
    adj: &HashMap<&'a str, Vec<&'a str>>,
) -> Option<ValidationError> {
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    let mut ordered: Vec<&str> = all_ids.iter().copied().collect();
    ordered.sort_unstable();
    for node in ordered {
        if !visited.contains(node) && has_cycle_dfs(node, adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Feeder cycle detected involving node '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
