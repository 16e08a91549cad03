//! Rule engine for multi-criteria dispatching.
//!
//! Composes dispatching rules with a configurable evaluation mode and a final
//! tie-breaking strategy. Sorting is stable, so matches that tie on every rule
//! keep their input order unless [`TieBreaker::ById`] is chosen.

use std::cmp::Ordering;
use std::sync::Arc;

use super::{DispatchContext, DispatchingRule, RuleScore};
use crate::models::Match;

/// How multiple rules are combined.
#[derive(Debug, Clone, Default)]
pub enum EvaluationMode {
    /// Apply rules in sequence; use next rule only on ties.
    #[default]
    Sequential,
    /// Compute weighted sum of all rule scores.
    Weighted,
}

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order.
    #[default]
    NextRule,
    /// Deterministic by match id (lexicographic).
    ById,
}

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn DispatchingRule>,
    weight: f64,
}

/// A composable rule engine for match ordering.
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<WeightedRule>,
    mode: EvaluationMode,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: EvaluationMode::Sequential,
            tie_breaker: TieBreaker::NextRule,
            epsilon: 1e-9,
        }
    }

    /// Order used by the greedy scheduler: pool phase before bracket phase,
    /// then declaration order.
    pub fn pool_first() -> Self {
        Self::new()
            .with_rule(super::rules::PhaseFirst)
            .with_tie_breaker(super::rules::DeclarationOrder)
    }

    /// Adds a primary rule (weight 1.0).
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 1.0,
        });
        self
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: DispatchingRule + 'static>(
        mut self,
        rule: R,
        weight: f64,
    ) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Adds a tie-breaking rule (weight 0.0, used only in Sequential mode).
    pub fn with_tie_breaker<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 0.0,
        });
        self
    }

    /// Sets the evaluation mode.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Sorts matches by priority (highest priority first).
    ///
    /// Returns indices into the original slice.
    pub fn sort_indices(&self, matches: &[Match], context: &DispatchContext) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..matches.len()).collect();

        match &self.mode {
            EvaluationMode::Sequential => {
                indices.sort_by(|&a, &b| self.compare_sequential(&matches[a], &matches[b], context));
            }
            EvaluationMode::Weighted => {
                let scores: Vec<f64> = matches
                    .iter()
                    .map(|m| self.weighted_score(m, context))
                    .collect();
                indices.sort_by(|&a, &b| {
                    scores[a]
                        .partial_cmp(&scores[b])
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| self.final_tie(&matches[a], &matches[b]))
                });
            }
        }

        indices
    }

    /// Returns the index of the highest-priority match.
    pub fn select_best(&self, matches: &[Match], context: &DispatchContext) -> Option<usize> {
        self.sort_indices(matches, context).first().copied()
    }

    /// Evaluates a single match and returns weighted scores from each rule.
    pub fn evaluate(&self, fixture: &Match, context: &DispatchContext) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(fixture, context) * wr.weight)
            .collect()
    }

    fn compare_sequential(&self, a: &Match, b: &Match, context: &DispatchContext) -> Ordering {
        for wr in &self.rules {
            let score_a = wr.rule.evaluate(a, context);
            let score_b = wr.rule.evaluate(b, context);

            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }

        self.final_tie(a, b)
    }

    fn final_tie(&self, a: &Match, b: &Match) -> Ordering {
        match &self.tie_breaker {
            TieBreaker::NextRule => Ordering::Equal,
            TieBreaker::ById => a.id.cmp(&b.id),
        }
    }

    fn weighted_score(&self, fixture: &Match, context: &DispatchContext) -> f64 {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(fixture, context) * wr.weight)
            .sum()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .finish()
    }
}
