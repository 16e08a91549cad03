//! Pool play: round-robin generation and standings.
//!
//! # Round-robin
//!
//! Circle method: one team stays fixed while the others rotate, so each
//! round pairs every team once (a phantom team gives an odd pool its
//! byes). Ids `POOL-{pool}-R{r}-M{s}` are assigned here, once.
//!
//! # Standings
//!
//! Wins, then set difference, then point difference, then seed, then name.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::{Match, MatchId, Phase, Team};
use crate::results::ResultStore;

/// Generates the round-robin of `pool` among the given teams.
///
/// Teams are taken in the order given (usually seed order).
///
/// ```
/// use u_tournament::pool::round_robin;
///
/// let matches = round_robin("A", &["Ants", "Bees", "Cats"]);
/// assert_eq!(matches.len(), 3);
/// assert_eq!(matches[0].id.as_str(), "POOL-A-R1-M1");
/// ```
pub fn round_robin<S: AsRef<str>>(pool: &str, teams: &[S]) -> Vec<Match> {
    let phase = Phase::Pool(pool.to_string());
    let mut ring: Vec<Option<&str>> = teams.iter().map(|t| Some(t.as_ref())).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for round in 1..n as u32 {
        let mut sequence = 0;
        for i in 0..n / 2 {
            let (Some(a), Some(b)) = (ring[i], ring[n - 1 - i]) else {
                continue;
            };
            // Alternate the fixed team's side
            let (home, away) = if i == 0 && round % 2 == 0 { (b, a) } else { (a, b) };
            sequence += 1;
            matches.push(Match::between(
                MatchId::new(&phase, round, sequence),
                phase.clone(),
                round,
                home,
                away,
            ));
        }
        ring[1..].rotate_right(1);
    }
    matches
}

/// Round-robins of every pool, pools in name order, teams in seed order.
pub fn pool_matches(teams: &[Team]) -> Vec<Match> {
    let mut pools: BTreeMap<&str, Vec<&Team>> = BTreeMap::new();
    for team in teams {
        pools.entry(team.pool.as_str()).or_default().push(team);
    }
    pools
        .into_iter()
        .flat_map(|(pool, mut members)| {
            members.sort_by(|a, b| a.seed.cmp(&b.seed).then_with(|| a.name.cmp(&b.name)));
            let names: Vec<&str> = members.iter().map(|t| t.name.as_str()).collect();
            round_robin(pool, &names)
        })
        .collect()
}

/// One row of a pool table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Team name.
    pub team: String,
    /// Seed within the pool (last tie-break).
    pub seed: u32,
    /// Completed matches.
    pub played: u32,
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
    /// Sets won across all matches.
    pub sets_won: u32,
    /// Sets lost across all matches.
    pub sets_lost: u32,
    /// Points scored across all sets.
    pub points_for: u32,
    /// Points conceded across all sets.
    pub points_against: u32,
}

impl Standing {
    /// Sets won minus sets lost.
    pub fn set_diff(&self) -> i64 {
        i64::from(self.sets_won) - i64::from(self.sets_lost)
    }

    /// Points scored minus points conceded.
    pub fn point_diff(&self) -> i64 {
        i64::from(self.points_for) - i64::from(self.points_against)
    }

    fn rank(&self, other: &Self) -> Ordering {
        other
            .wins
            .cmp(&self.wins)
            .then_with(|| other.set_diff().cmp(&self.set_diff()))
            .then_with(|| other.point_diff().cmp(&self.point_diff()))
            .then_with(|| self.seed.cmp(&other.seed))
            .then_with(|| self.team.cmp(&other.team))
    }
}

/// Table of `pool`, best first, from the completed results in `store`.
pub fn standings(pool: &str, teams: &[Team], matches: &[Match], store: &ResultStore) -> Vec<Standing> {
    let mut rows: HashMap<&str, Standing> = teams
        .iter()
        .filter(|t| t.pool == pool)
        .map(|t| {
            (
                t.name.as_str(),
                Standing {
                    team: t.name.clone(),
                    seed: t.seed,
                    ..Standing::default()
                },
            )
        })
        .collect();

    for m in matches.iter().filter(|m| m.phase.pool() == Some(pool)) {
        let Some(result) = store.get(&m.id).and_then(|r| r.completed()) else {
            continue;
        };
        let (sets_w, sets_l) = result.sets_won();
        let (points_w, points_l) = result.points();

        if let Some(row) = rows.get_mut(result.winner.as_str()) {
            row.played += 1;
            row.wins += 1;
            row.sets_won += sets_w;
            row.sets_lost += sets_l;
            row.points_for += points_w;
            row.points_against += points_l;
        }
        if let Some(row) = rows.get_mut(result.loser.as_str()) {
            row.played += 1;
            row.losses += 1;
            row.sets_won += sets_l;
            row.sets_lost += sets_w;
            row.points_for += points_l;
            row.points_against += points_w;
        }
    }

    let mut table: Vec<Standing> = rows.into_values().collect();
    table.sort_by(Standing::rank);
    table
}

/// Whether every match of `pool` has a completed result.
pub fn pool_complete(pool: &str, matches: &[Match], store: &ResultStore) -> bool {
    matches
        .iter()
        .filter(|m| m.phase.pool() == Some(pool))
        .all(|m| store.get(&m.id).and_then(|r| r.completed()).is_some())
}

/// Finishing order of every pool, keyed by pool name.
pub fn finishing_orders(
    teams: &[Team],
    matches: &[Match],
    store: &ResultStore,
) -> BTreeMap<String, Vec<String>> {
    let mut pools: Vec<&str> = teams.iter().map(|t| t.pool.as_str()).collect();
    pools.sort_unstable();
    pools.dedup();
    pools
        .into_iter()
        .map(|pool| {
            let order = standings(pool, teams, matches, store)
                .into_iter()
                .map(|s| s.team)
                .collect();
            (pool.to_string(), order)
        })
        .collect()
}
