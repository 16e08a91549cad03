//! Bracket layout.

use log::info;

use crate::error::BracketStateError;
use crate::models::{BracketSide, MatchId, Phase};

use super::seeding::{bracket_size, seed_positions, SeedEntry};
use super::{
    Bracket, BracketFormat, BracketNode, BracketSlot, Entrant, NodeState, Route, SlotSource,
};

/// Lays out a bracket for `seeds` (in seed order).
///
/// Seeds without a team stay as placeholders until
/// [`Bracket::resolve_seeds`] fills them. Byes go to the top seeds and are
/// auto-advanced as soon as their sole participant is known.
///
/// # Example
/// ```
/// use u_tournament::bracket::{generate, seeds_from_plan, BracketFormat};
///
/// let seeds = seeds_from_plan(&[("A".to_string(), 3), ("B".to_string(), 3)]);
/// let bracket = generate(seeds, BracketFormat::DoubleElimination).unwrap();
/// assert_eq!(bracket.size, 8);
/// assert_eq!(bracket.byes, 2);
/// ```
pub fn generate(seeds: Vec<SeedEntry>, format: BracketFormat) -> Result<Bracket, BracketStateError> {
    if seeds.len() < 2 {
        return Err(BracketStateError::TooFewTeams(seeds.len()));
    }

    let size = bracket_size(seeds.len());
    let rounds = size.trailing_zeros();
    let mut nodes = Vec::new();

    // Winners bracket
    let winners = Phase::Bracket(BracketSide::Winners);
    let positions = seed_positions(size);
    let mut winners_rounds: Vec<Vec<MatchId>> = Vec::new();
    for round in 1..=rounds {
        let mut ids = Vec::new();
        let count = size >> round;
        for position in 1..=count {
            let id = MatchId::new(&winners, round, position);
            let i = (position - 1) as usize;
            let sources = if round == 1 {
                [
                    SlotSource::Seed(positions[2 * i]),
                    SlotSource::Seed(positions[2 * i + 1]),
                ]
            } else {
                let prev = &winners_rounds[(round - 2) as usize];
                [
                    SlotSource::WinnerOf(prev[2 * i].clone()),
                    SlotSource::WinnerOf(prev[2 * i + 1].clone()),
                ]
            };
            nodes.push(node(id.clone(), BracketSide::Winners, round, position, sources));
            ids.push(id);
        }
        winners_rounds.push(ids);
    }

    let mut grand_final = None;
    let mut reset = None;
    let mut terminal = winners_rounds[rounds as usize - 1][0].clone();

    if format == BracketFormat::DoubleElimination {
        let losers = Phase::Bracket(BracketSide::Losers);
        let mut previous: Vec<MatchId> = Vec::new();
        let mut losers_round = 0;

        for i in 1..rounds as usize {
            // Minor round: survivors meet each other
            losers_round += 1;
            let feeders: Vec<SlotSource> = if i == 1 {
                winners_rounds[0]
                    .iter()
                    .map(|id| SlotSource::LoserOf(id.clone()))
                    .collect()
            } else {
                previous
                    .iter()
                    .map(|id| SlotSource::WinnerOf(id.clone()))
                    .collect()
            };
            let mut minor = Vec::new();
            for (j, pair) in feeders.chunks(2).enumerate() {
                let id = MatchId::new(&losers, losers_round, j as u32 + 1);
                let sources = [pair[0].clone(), pair[1].clone()];
                nodes.push(node(id.clone(), BracketSide::Losers, losers_round, j as u32 + 1, sources));
                minor.push(id);
            }

            // Major round: survivors take in the losers of winners round i+1
            losers_round += 1;
            let mut major = Vec::new();
            for (j, survivor) in minor.iter().enumerate() {
                let id = MatchId::new(&losers, losers_round, j as u32 + 1);
                let sources = [
                    SlotSource::WinnerOf(survivor.clone()),
                    SlotSource::LoserOf(winners_rounds[i][j].clone()),
                ];
                nodes.push(node(id.clone(), BracketSide::Losers, losers_round, j as u32 + 1, sources));
                major.push(id);
            }
            previous = major;
        }

        let gf_phase = Phase::Bracket(BracketSide::GrandFinal);
        let gf_id = MatchId::new(&gf_phase, 1, 1);
        let winners_final = winners_rounds[rounds as usize - 1][0].clone();
        let losers_source = match previous.first() {
            Some(losers_final) => SlotSource::WinnerOf(losers_final.clone()),
            None => SlotSource::LoserOf(winners_final.clone()),
        };
        nodes.push(node(
            gf_id.clone(),
            BracketSide::GrandFinal,
            1,
            1,
            [SlotSource::WinnerOf(winners_final), losers_source],
        ));

        let reset_id = MatchId::new(&gf_phase, 2, 1);
        let mut reset_node = node(
            reset_id.clone(),
            BracketSide::GrandFinal,
            2,
            1,
            [
                SlotSource::WinnerOf(gf_id.clone()),
                SlotSource::LoserOf(gf_id.clone()),
            ],
        );
        reset_node.conditional = true;
        nodes.push(reset_node);

        terminal = gf_id.clone();
        grand_final = Some(gf_id);
        reset = Some(reset_id);
    }

    link_routes(&mut nodes);

    let teams = seeds.len();
    let mut bracket = Bracket {
        format,
        size,
        byes: size - teams as u32,
        seeds,
        nodes,
        grand_final,
        reset,
        terminal,
    };
    bracket.fill_seed_slots();
    bracket.settle();

    info!(
        "generated {:?} bracket: {} teams, size {}, {} byes, {} nodes",
        format,
        teams,
        bracket.size,
        bracket.byes,
        bracket.nodes.len()
    );
    Ok(bracket)
}

fn node(id: MatchId, side: BracketSide, round: u32, position: u32, sources: [SlotSource; 2]) -> BracketNode {
    let [a, b] = sources;
    BracketNode {
        id,
        side,
        round,
        position,
        slots: [BracketSlot::new(a), BracketSlot::new(b)],
        state: NodeState::Pending,
        winner: None,
        winner_to: None,
        loser_to: None,
        conditional: false,
        result: None,
    }
}

/// Points every feeder at the slots that read from it.
fn link_routes(nodes: &mut [BracketNode]) {
    let mut links = Vec::new();
    for target in nodes.iter() {
        for (slot, s) in target.slots.iter().enumerate() {
            let route = Route {
                target: target.id.clone(),
                slot,
            };
            match &s.source {
                SlotSource::WinnerOf(feeder) => links.push((feeder.clone(), true, route)),
                SlotSource::LoserOf(feeder) => links.push((feeder.clone(), false, route)),
                SlotSource::Seed(_) => {}
            }
        }
    }
    for (feeder, winner, route) in links {
        if let Some(n) = nodes.iter_mut().find(|n| n.id == feeder) {
            if winner {
                n.winner_to = Some(route);
            } else {
                n.loser_to = Some(route);
            }
        }
    }
}

impl Bracket {
    /// Writes known seed teams and empty seeds into first-round slots.
    pub(crate) fn fill_seed_slots(&mut self) {
        let teams = self.seeds.len() as u32;
        for node in self.nodes.iter_mut() {
            if node.state != NodeState::Pending {
                continue;
            }
            for slot in node.slots.iter_mut() {
                let SlotSource::Seed(seed) = slot.source else {
                    continue;
                };
                if slot.entrant != Entrant::Unresolved {
                    continue;
                }
                slot.entrant = if seed > teams {
                    Entrant::Empty
                } else {
                    match &self.seeds[(seed - 1) as usize].team {
                        Some(team) => Entrant::Team(team.clone()),
                        None => Entrant::Unresolved,
                    }
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::seeds_from_plan;

    fn named(count: usize) -> Vec<SeedEntry> {
        (1..=count)
            .map(|i| SeedEntry {
                seed: i as u32,
                pool: "A".into(),
                position: i as u32,
                team: Some(format!("T{i}")),
            })
            .collect()
    }

    fn id(raw: &str) -> MatchId {
        MatchId::from_raw(raw)
    }

    #[test]
    fn test_too_few_teams() {
        assert_eq!(
            generate(named(1), BracketFormat::SingleElimination),
            Err(BracketStateError::TooFewTeams(1))
        );
    }

    #[test]
    fn test_single_elimination_layout() {
        let b = generate(named(8), BracketFormat::SingleElimination).unwrap();
        assert_eq!(b.nodes.len(), 7);
        assert_eq!(b.rounds(BracketSide::Winners), 3);
        assert_eq!(b.terminal, id("WB-R3-M1"));

        let first = b.node(&id("WB-R1-M1")).unwrap();
        assert_eq!(first.team(0), Some("T1"));
        assert_eq!(first.team(1), Some("T8"));
        assert_eq!(first.state, NodeState::Ready);
        assert_eq!(
            first.winner_to,
            Some(Route {
                target: id("WB-R2-M1"),
                slot: 0
            })
        );
        assert_eq!(first.loser_to, None);
    }

    #[test]
    fn test_byes_go_to_top_seeds() {
        let b = generate(named(6), BracketFormat::SingleElimination).unwrap();
        assert_eq!(b.size, 8);
        assert_eq!(b.byes, 2);
        let byes: Vec<&MatchId> = b.in_state(NodeState::Bye);
        assert_eq!(byes, vec![&id("WB-R1-M1"), &id("WB-R1-M3")]);

        // Seeds 1 and 2 already sit in round 2
        let semi_top = b.node(&id("WB-R2-M1")).unwrap();
        assert_eq!(semi_top.team(0), Some("T1"));
        let semi_bottom = b.node(&id("WB-R2-M2")).unwrap();
        assert_eq!(semi_bottom.team(0), Some("T2"));
    }

    #[test]
    fn test_double_elimination_layout() {
        let b = generate(named(8), BracketFormat::DoubleElimination).unwrap();
        // 7 winners, 6 losers, grand final, reset
        assert_eq!(b.nodes.len(), 15);
        assert_eq!(b.rounds(BracketSide::Losers), 4);
        assert_eq!(b.grand_final, Some(id("GF-R1-M1")));
        assert_eq!(b.reset, Some(id("GF-R2-M1")));
        assert_eq!(b.terminal, id("GF-R1-M1"));

        let lb1 = b.node(&id("LB-R1-M1")).unwrap();
        assert_eq!(lb1.slots[0].source, SlotSource::LoserOf(id("WB-R1-M1")));
        assert_eq!(lb1.slots[1].source, SlotSource::LoserOf(id("WB-R1-M2")));

        let lb2 = b.node(&id("LB-R2-M2")).unwrap();
        assert_eq!(lb2.slots[0].source, SlotSource::WinnerOf(id("LB-R1-M2")));
        assert_eq!(lb2.slots[1].source, SlotSource::LoserOf(id("WB-R2-M2")));

        let final_loser = b.node(&id("WB-R3-M1")).unwrap();
        assert_eq!(
            final_loser.loser_to,
            Some(Route {
                target: id("LB-R4-M1"),
                slot: 1
            })
        );

        let gf = b.node(&id("GF-R1-M1")).unwrap();
        assert_eq!(gf.slots[1].source, SlotSource::WinnerOf(id("LB-R4-M1")));
        assert!(b.node(&id("GF-R2-M1")).unwrap().conditional);
    }

    #[test]
    fn test_two_team_double_elimination() {
        let b = generate(named(2), BracketFormat::DoubleElimination).unwrap();
        assert_eq!(b.nodes.len(), 3);
        let gf = b.node(&id("GF-R1-M1")).unwrap();
        assert_eq!(gf.slots[1].source, SlotSource::LoserOf(id("WB-R1-M1")));
    }

    #[test]
    fn test_placeholder_seeds_stay_pending() {
        let seeds = seeds_from_plan(&[("A".to_string(), 1), ("B".to_string(), 1)]);
        let b = generate(seeds, BracketFormat::SingleElimination).unwrap();
        assert_eq!(b.nodes.len(), 1);
        assert_eq!(b.byes, 0);
        assert_eq!(b.nodes[0].state, NodeState::Pending);
    }
}
