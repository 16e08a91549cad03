//! Seeding: who enters the bracket, in which order, at which position.
//!
//! Seeds are taken position-major across pools: every pool winner first
//! (pools ordered by name), then every runner-up, and so on. Seed `s` is
//! placed by the standard binary pairing (1 vs N, 2 vs N-1, ...), nested so
//! that the top two seeds can only meet in the final.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One bracket entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    /// Seed number, 1-based.
    pub seed: u32,
    /// Pool the entry qualifies from.
    pub pool: String,
    /// Finishing position in that pool, 1-based.
    pub position: u32,
    /// Team, once standings are known.
    pub team: Option<String>,
}

impl SeedEntry {
    /// Seed-relative label, e.g. `#1 A`.
    pub fn label(&self) -> String {
        format!("#{} {}", self.position, self.pool)
    }
}

impl fmt::Display for SeedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.team {
            Some(team) => f.write_str(team),
            None => f.write_str(&self.label()),
        }
    }
}

/// Seeds from final pool standings.
///
/// `standings` maps pool name to its finishing order. Pools with fewer
/// teams than `advance_per_pool` contribute what they have.
pub fn seeds_from_standings(
    standings: &BTreeMap<String, Vec<String>>,
    advance_per_pool: usize,
) -> Vec<SeedEntry> {
    let mut seeds = Vec::new();
    for position in 0..advance_per_pool {
        for (pool, order) in standings {
            if let Some(team) = order.get(position) {
                seeds.push(SeedEntry {
                    seed: seeds.len() as u32 + 1,
                    pool: pool.clone(),
                    position: position as u32 + 1,
                    team: Some(team.clone()),
                });
            }
        }
    }
    seeds
}

/// Placeholder seeds from a pool plan (pool name, teams advancing).
///
/// Used to lay out a bracket before any pool match is played.
pub fn seeds_from_plan(plan: &[(String, usize)]) -> Vec<SeedEntry> {
    let mut pools: Vec<&(String, usize)> = plan.iter().collect();
    pools.sort_by(|a, b| a.0.cmp(&b.0));
    let deepest = pools.iter().map(|(_, n)| *n).max().unwrap_or(0);

    let mut seeds = Vec::new();
    for position in 0..deepest {
        for (pool, advancing) in &pools {
            if position < *advancing {
                seeds.push(SeedEntry {
                    seed: seeds.len() as u32 + 1,
                    pool: pool.clone(),
                    position: position as u32 + 1,
                    team: None,
                });
            }
        }
    }
    seeds
}

/// Smallest power of two holding `teams` entries (at least 2).
pub fn bracket_size(teams: usize) -> u32 {
    teams.max(2).next_power_of_two() as u32
}

/// Byes needed for `teams` entries.
pub fn bye_count(teams: usize) -> u32 {
    bracket_size(teams) - teams as u32
}

/// Seed at each first-round position of a bracket of `size`.
///
/// Consecutive pairs form the first-round matches.
pub fn seed_positions(size: u32) -> Vec<u32> {
    let mut seeds = vec![1u32];
    while seeds.len() < size as usize {
        let n = seeds.len() as u32;
        let mut next = Vec::with_capacity(seeds.len() * 2);
        for seed in seeds.iter().copied() {
            next.push(seed);
            next.push((n * 2 + 1).saturating_sub(seed));
        }
        seeds = next;
    }
    seeds
}
