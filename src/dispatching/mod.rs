//! Dispatching rules and rule engine for match ordering.
//!
//! The greedy scheduler places matches one at a time, so the order it visits
//! them in decides the schedule. Rules score a match (lower = earlier) and the
//! engine composes them.
//!
//! # Usage
//!
//! ```
//! use u_tournament::dispatching::{rules, DispatchContext, RuleEngine, TieBreaker};
//!
//! let engine = RuleEngine::new()
//!     .with_rule(rules::PhaseFirst)
//!     .with_tie_breaker(rules::DeclarationOrder)
//!     .with_final_tie_breaker(TieBreaker::ById);
//!
//! let context = DispatchContext::for_matches(&[]);
//! assert!(engine.sort_indices(&[], &context).is_empty());
//! ```

mod context;
mod engine;
pub mod rules;

pub use context::DispatchContext;
pub use engine::{EvaluationMode, RuleEngine, TieBreaker};

use crate::models::Match;
use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (placed first).
pub type RuleScore = f64;

/// A dispatching rule that evaluates match priority.
///
/// **Lower score = higher priority.**
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "PHASE", "DECL").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of a match.
    fn evaluate(&self, fixture: &Match, context: &DispatchContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
