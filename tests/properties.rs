//! Property-based tests for schedules and brackets.

use chrono::NaiveTime;
use proptest::prelude::*;
use std::time::Duration;

use u_tournament::bracket::{generate, Bracket, BracketFormat, NodeState, SeedEntry};
use u_tournament::config::SchedulerConfig;
use u_tournament::models::{BracketSide, ConstraintSet, Court, MatchId, Schedule, Team};
use u_tournament::pool::pool_matches;
use u_tournament::results::CompletedResult;
use u_tournament::scheduler::{run_schedule, ScheduleRequest};

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn seeds(count: usize) -> Vec<SeedEntry> {
    (1..=count)
        .map(|i| SeedEntry {
            seed: i as u32,
            pool: "A".into(),
            position: i as u32,
            team: Some(format!("T{i}")),
        })
        .collect()
}

// Pools of 2 to 5 teams
fn teams_strategy() -> impl Strategy<Value = Vec<Team>> {
    prop::collection::vec(2usize..=5, 1..=3).prop_map(|sizes| {
        sizes
            .iter()
            .enumerate()
            .flat_map(|(p, &size)| {
                let pool = ((b'A' + p as u8) as char).to_string();
                (1..=size).map(move |s| Team::new(format!("{pool}{s}"), pool.clone(), s as u32))
            })
            .collect()
    })
}

fn check_hard_constraints(schedule: &Schedule, break_min: i64, closes: i64) -> Result<(), TestCaseError> {
    let a = &schedule.assignments;
    for x in a {
        prop_assert!(x.end <= closes, "{} ends at {}", x.match_id, x.end);
    }
    for i in 0..a.len() {
        for j in i + 1..a.len() {
            if a[i].court == a[j].court {
                prop_assert!(!a[i].window().overlaps(&a[j].window()));
            }
            if a[i].teams.iter().any(|t| a[j].involves(t)) {
                prop_assert!(a[i].window().gap_to(&a[j].window()) >= break_min);
            }
        }
    }
    Ok(())
}

/// Plays every ready node, choosing the winning slot from `picks`.
fn play_out(bracket: &mut Bracket, picks: &[bool]) -> Vec<(MatchId, usize)> {
    let mut played = Vec::new();
    loop {
        let Some(id) = bracket.in_state(NodeState::Ready).first().map(|id| (*id).clone()) else {
            break;
        };
        let slot = usize::from(picks.get(played.len()).copied().unwrap_or(false));
        let node = bracket.node(&id).unwrap();
        let result = CompletedResult::forfeit(node.team(slot).unwrap(), node.team(1 - slot).unwrap()).unwrap();
        bracket.record(&id, &result).unwrap();
        played.push((id, slot));
    }
    played
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_schedules_respect_hard_constraints(
        teams in teams_strategy(),
        courts in 1usize..=3,
        break_min in 0i64..=30,
        optimizer in any::<bool>(),
    ) {
        let matches = pool_matches(&teams);
        let courts: Vec<Court> = (1..=courts)
            .map(|c| Court::daily(format!("C{c}"), 1, hm(9, 0), hm(18, 0)))
            .collect();
        let constraints = ConstraintSet::new().with_break(break_min);
        let config = SchedulerConfig {
            use_optimizer: optimizer,
            ..SchedulerConfig::default()
                .with_time_budget(Duration::from_millis(200))
                .with_node_limit(50_000)
        };

        let request = ScheduleRequest::new(teams, courts, matches.clone()).with_constraints(constraints);
        let run = run_schedule(&request, &config);

        prop_assert_eq!(run.summary.scheduled + run.summary.unscheduled, matches.len());
        check_hard_constraints(&run.schedule, break_min, 18 * 60)?;
    }

    #[test]
    fn test_byes_go_to_top_seeds(count in 2usize..=40) {
        let bracket = generate(seeds(count), BracketFormat::SingleElimination).unwrap();
        let expected = count.next_power_of_two() - count;
        prop_assert_eq!(bracket.byes as usize, expected);

        let mut advanced: Vec<u32> = bracket
            .side(BracketSide::Winners)
            .filter(|n| n.round == 1 && n.state == NodeState::Bye)
            .filter_map(|n| n.winning_team())
            .map(|t| t[1..].parse::<u32>().unwrap())
            .collect();
        advanced.sort_unstable();
        let top: Vec<u32> = (1..=expected as u32).collect();
        prop_assert_eq!(advanced, top);
    }

    #[test]
    fn test_double_elimination_needs_two_losses(
        count in 2usize..=16,
        picks in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut bracket = generate(seeds(count), BracketFormat::DoubleElimination).unwrap();
        let played = play_out(&mut bracket, &picks);
        prop_assert!(bracket.is_finished());

        let champion = bracket.champion().unwrap();
        for i in 1..=count {
            let team = format!("T{i}");
            if team == champion {
                prop_assert!(bracket.losses(&team) <= 1);
                prop_assert!(!bracket.is_eliminated(&team));
            } else {
                prop_assert_eq!(bracket.losses(&team), 2, "{} lost {} times", team, bracket.losses(&team));
            }
        }

        let gf = MatchId::from_raw("GF-R1-M1");
        let gf_slot = played.iter().find(|(id, _)| *id == gf).map(|(_, s)| *s).unwrap();
        let reset = bracket.node(&MatchId::from_raw("GF-R2-M1")).unwrap();
        prop_assert_eq!(reset.state == NodeState::Completed, gf_slot == 1);
        prop_assert_eq!(reset.state == NodeState::Inactive, gf_slot == 0);
    }

    #[test]
    fn test_resubmitting_a_result_changes_nothing(
        count in 2usize..=12,
        picks in prop::collection::vec(any::<bool>(), 32),
        repeat in 0usize..32,
        double in any::<bool>(),
    ) {
        let format = if double { BracketFormat::DoubleElimination } else { BracketFormat::SingleElimination };
        let mut bracket = generate(seeds(count), format).unwrap();
        let played = play_out(&mut bracket, &picks);
        let (id, slot) = played[repeat % played.len()].clone();

        let node = bracket.node(&id).unwrap();
        let result = CompletedResult::forfeit(node.team(slot).unwrap(), node.team(1 - slot).unwrap()).unwrap();
        let before = bracket.clone();
        let progress = bracket.record(&id, &result).unwrap();
        prop_assert!(progress.replaced);
        prop_assert_eq!(bracket, before);
    }
}
