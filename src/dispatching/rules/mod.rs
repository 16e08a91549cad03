//! Built-in dispatching rules.
//!
//! # Categories
//!
//! - **Structural**: PHASE, ROUND, DECL
//! - **Load**: CONSTRAINED, BUSIEST
//!
//! # Score Convention
//! All rules return lower scores for matches that should be placed first.

use super::{DispatchContext, DispatchingRule, RuleScore};
use crate::models::{BracketSide, Match, Phase};

// ======================== Structural rules ========================

/// Pool phase first, then winners, losers, grand final.
#[derive(Debug, Clone, Copy)]
pub struct PhaseFirst;

impl DispatchingRule for PhaseFirst {
    fn name(&self) -> &'static str {
        "PHASE"
    }

    fn evaluate(&self, fixture: &Match, _context: &DispatchContext) -> RuleScore {
        match fixture.phase {
            Phase::Pool(_) => 0.0,
            Phase::Bracket(BracketSide::Winners) => 1.0,
            Phase::Bracket(BracketSide::Losers) => 2.0,
            Phase::Bracket(BracketSide::GrandFinal) => 3.0,
        }
    }

    fn description(&self) -> &'static str {
        "Pool Phase First"
    }
}

/// Lower round first.
#[derive(Debug, Clone, Copy)]
pub struct EarlierRound;

impl DispatchingRule for EarlierRound {
    fn name(&self) -> &'static str {
        "ROUND"
    }

    fn evaluate(&self, fixture: &Match, _context: &DispatchContext) -> RuleScore {
        f64::from(fixture.round)
    }

    fn description(&self) -> &'static str {
        "Earlier Round First"
    }
}

/// Input order.
#[derive(Debug, Clone, Copy)]
pub struct DeclarationOrder;

impl DispatchingRule for DeclarationOrder {
    fn name(&self) -> &'static str {
        "DECL"
    }

    fn evaluate(&self, fixture: &Match, context: &DispatchContext) -> RuleScore {
        context.position(&fixture.id) as f64
    }

    fn description(&self) -> &'static str {
        "Declaration Order"
    }
}

// ======================== Load rules ========================

/// Matches involving a team with a play window first.
///
/// Such matches have fewer admissible slots, so placing them early leaves
/// the flexible matches to fill around them.
#[derive(Debug, Clone, Copy)]
pub struct ConstrainedFirst;

impl DispatchingRule for ConstrainedFirst {
    fn name(&self) -> &'static str {
        "CONSTRAINED"
    }

    fn evaluate(&self, fixture: &Match, context: &DispatchContext) -> RuleScore {
        let constrained = fixture
            .teams()
            .is_some_and(|teams| teams.iter().any(|t| context.constrained_teams.contains(*t)));
        if constrained {
            0.0
        } else {
            1.0
        }
    }

    fn description(&self) -> &'static str {
        "Constrained Teams First"
    }
}

/// Matches of the busiest teams first.
#[derive(Debug, Clone, Copy)]
pub struct BusiestFirst;

impl DispatchingRule for BusiestFirst {
    fn name(&self) -> &'static str {
        "BUSIEST"
    }

    fn evaluate(&self, fixture: &Match, context: &DispatchContext) -> RuleScore {
        let load: usize = fixture
            .teams()
            .map(|teams| teams.iter().map(|t| context.load(t)).sum())
            .unwrap_or(0);
        -(load as f64)
    }

    fn description(&self) -> &'static str {
        "Busiest Teams First"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchId, Participant};

    fn pool(id: &str, home: &str, away: &str) -> Match {
        Match::between(MatchId::from_raw(id), Phase::Pool("A".into()), 1, home, away)
    }

    #[test]
    fn test_phase_scores() {
        let ctx = DispatchContext::default();
        let lb = Match::new(
            MatchId::from_raw("LB-R1-M1"),
            Phase::Bracket(BracketSide::Losers),
            1,
            Participant::Placeholder("Loser of WB-R1-M1".into()),
            Participant::Placeholder("Loser of WB-R1-M2".into()),
        );
        assert_eq!(PhaseFirst.evaluate(&pool("m", "a", "b"), &ctx), 0.0);
        assert_eq!(PhaseFirst.evaluate(&lb, &ctx), 2.0);
        // Placeholder teams carry no load
        assert_eq!(BusiestFirst.evaluate(&lb, &ctx), 0.0);
    }

    #[test]
    fn test_declaration_order() {
        let matches = vec![pool("m1", "a", "b"), pool("m2", "a", "c")];
        let ctx = DispatchContext::for_matches(&matches);
        assert_eq!(DeclarationOrder.evaluate(&matches[1], &ctx), 1.0);
        let stranger = pool("zz", "a", "b");
        assert_eq!(DeclarationOrder.evaluate(&stranger, &ctx), usize::MAX as f64);
    }

    #[test]
    fn test_constrained_first() {
        let matches = vec![pool("m1", "a", "b"), pool("m2", "c", "d")];
        let ctx = DispatchContext::for_matches(&matches).with_constrained_team("d");
        assert_eq!(ConstrainedFirst.evaluate(&matches[0], &ctx), 1.0);
        assert_eq!(ConstrainedFirst.evaluate(&matches[1], &ctx), 0.0);
    }

    #[test]
    fn test_busiest_first() {
        let matches = vec![
            pool("m1", "a", "b"),
            pool("m2", "a", "c"),
            pool("m3", "a", "d"),
        ];
        let ctx = DispatchContext::for_matches(&matches);
        // a plays 3, b plays 1
        assert_eq!(BusiestFirst.evaluate(&matches[0], &ctx), -4.0);
    }
}
