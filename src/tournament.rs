//! Per-tournament context.
//!
//! A [`Tournament`] owns everything one event needs: entries, courts,
//! constraints, pool fixtures, the bracket, the result store and the latest
//! schedule. Every operation goes through it, so two tournaments never
//! share mutable state.
//!
//! [`TournamentRegistry`] keeps many tournaments side by side, each behind
//! its own lock: submissions to one tournament are serialized, different
//! tournaments proceed independently.

use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::bracket::{generate, seeds_from_plan, seeds_from_standings, Bracket, BracketFormat, Progress};
use crate::config::SchedulerConfig;
use crate::error::{Error, ResultError};
use crate::models::{ConstraintSet, Court, Match, MatchId, Schedule, Team};
use crate::pool::{self, Standing};
use crate::results::{enrich, CompletedResult, EnrichedResult, MatchResult, ResultStore};
use crate::scheduler::{run_schedule, ScheduleRequest, ScheduleRun};

/// One tournament: pools, bracket, results and schedule.
#[derive(Debug, Clone)]
pub struct Tournament {
    id: String,
    teams: Vec<Team>,
    courts: Vec<Court>,
    constraints: ConstraintSet,
    config: SchedulerConfig,
    format: BracketFormat,
    advance_per_pool: usize,
    pool_matches: Vec<Match>,
    bracket: Option<Bracket>,
    results: ResultStore,
    schedule: Option<ScheduleRun>,
}

impl Tournament {
    /// Creates a tournament and generates its pool round-robins.
    ///
    /// Defaults: single elimination, top two of each pool advance.
    pub fn new(id: impl Into<String>, teams: Vec<Team>, courts: Vec<Court>) -> Self {
        let pool_matches = pool::pool_matches(&teams);
        Self {
            id: id.into(),
            teams,
            courts,
            constraints: ConstraintSet::default(),
            config: SchedulerConfig::default(),
            format: BracketFormat::SingleElimination,
            advance_per_pool: 2,
            pool_matches,
            bracket: None,
            results: ResultStore::new(),
            schedule: None,
        }
    }

    /// Sets the scheduling constraints.
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the scheduler configuration.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the elimination format.
    pub fn with_format(mut self, format: BracketFormat) -> Self {
        self.format = format;
        self
    }

    /// Number of teams per pool entering the bracket.
    pub fn advancing(mut self, per_pool: usize) -> Self {
        self.advance_per_pool = per_pool;
        self
    }

    /// Tournament id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Entered teams.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Round-robin matches of every pool.
    pub fn pool_matches(&self) -> &[Match] {
        &self.pool_matches
    }

    /// The bracket, once generated.
    pub fn bracket(&self) -> Option<&Bracket> {
        self.bracket.as_ref()
    }

    /// Stored results.
    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Mutable access to the store, e.g. to import legacy results.
    pub fn results_mut(&mut self) -> &mut ResultStore {
        &mut self.results
    }

    /// Latest scheduling run.
    pub fn last_run(&self) -> Option<&ScheduleRun> {
        self.schedule.as_ref()
    }

    fn pools(&self) -> Vec<&str> {
        let mut pools: Vec<&str> = self.teams.iter().map(|t| t.pool.as_str()).collect();
        pools.sort_unstable();
        pools.dedup();
        pools
    }

    /// Whether every pool match has a result.
    pub fn pools_complete(&self) -> bool {
        self.pools()
            .into_iter()
            .all(|p| pool::pool_complete(p, &self.pool_matches, &self.results))
    }

    /// Current table of `pool`.
    pub fn standings(&self, pool: &str) -> Vec<Standing> {
        pool::standings(pool, &self.teams, &self.pool_matches, &self.results)
    }

    /// Lays out the bracket.
    ///
    /// With pool play finished the seeds are the actual finishers; before
    /// that they are placeholders (`#1 A`, ...) filled later by
    /// [`Tournament::resolve_bracket_seeds`]. Generating again replaces the
    /// previous bracket.
    pub fn generate_bracket(&mut self) -> Result<&Bracket, Error> {
        let seeds = if self.pools_complete() {
            let orders = pool::finishing_orders(&self.teams, &self.pool_matches, &self.results);
            seeds_from_standings(&orders, self.advance_per_pool)
        } else {
            let plan: Vec<(String, usize)> = self
                .pools()
                .into_iter()
                .map(|p| {
                    let size = self.teams.iter().filter(|t| t.pool == p).count();
                    (p.to_string(), size.min(self.advance_per_pool))
                })
                .collect();
            seeds_from_plan(&plan)
        };

        let bracket = generate(seeds, self.format)?;
        info!("{}: bracket generated with {} nodes", self.id, bracket.nodes.len());
        Ok(self.bracket.insert(bracket))
    }

    /// Fills placeholder seeds from the final pool standings.
    pub fn resolve_bracket_seeds(&mut self) -> Result<usize, Error> {
        let orders = pool::finishing_orders(&self.teams, &self.pool_matches, &self.results);
        let bracket = self.bracket.as_mut().ok_or(Error::NoBracket)?;
        Ok(bracket.resolve_seeds(&orders)?)
    }

    /// Pool matches followed by bracket fixtures.
    pub fn matches(&self) -> Vec<Match> {
        let mut all = self.pool_matches.clone();
        if let Some(bracket) = &self.bracket {
            all.extend(bracket.fixtures());
        }
        all
    }

    /// Schedules every current match.
    pub fn schedule(&mut self) -> &ScheduleRun {
        let request = ScheduleRequest {
            teams: self.teams.clone(),
            courts: self.courts.clone(),
            constraints: self.constraints.clone(),
            matches: self.matches(),
        };
        let run = run_schedule(&request, &self.config);
        self.schedule.insert(run)
    }

    /// Moves a ready bracket match to in-progress.
    pub fn start_match(&mut self, id: &MatchId) -> Result<(), Error> {
        let bracket = self.bracket.as_mut().ok_or(Error::NoBracket)?;
        Ok(bracket.start(id)?)
    }

    /// Submits the result of a pool or bracket match.
    ///
    /// Bracket results go through the progression engine first; a rejected
    /// result is not stored. Returns the bracket progress for bracket
    /// matches.
    pub fn submit_result(
        &mut self,
        id: &MatchId,
        result: CompletedResult,
    ) -> Result<Option<Progress>, Error> {
        if let Some(m) = self.pool_matches.iter().find(|m| &m.id == id) {
            let teams_match = m
                .teams()
                .is_some_and(|[home, away]| result.involves(home) && result.involves(away));
            if !teams_match {
                warn!("{}: result for {id} names other teams", self.id);
                return Err(ResultError::WrongTeams(id.clone()).into());
            }
            self.results.save(id.clone(), MatchResult::Completed(result));
            return Ok(None);
        }

        let bracket = self
            .bracket
            .as_mut()
            .filter(|b| b.node(id).is_some())
            .ok_or_else(|| Error::UnknownMatch(id.clone()))?;
        let progress = bracket.record(id, &result)?;
        self.results.save(id.clone(), MatchResult::Completed(result));
        Ok(Some(progress))
    }

    /// Every match with its assignment and result.
    pub fn enriched_results(&self) -> Vec<EnrichedResult> {
        let empty = Schedule::new();
        let schedule = self.schedule.as_ref().map_or(&empty, |r| &r.schedule);
        enrich(&self.matches(), schedule, &self.results)
    }

    /// Finishing order of every pool.
    pub fn finishing_orders(&self) -> BTreeMap<String, Vec<String>> {
        pool::finishing_orders(&self.teams, &self.pool_matches, &self.results)
    }
}

/// Shared handle to one tournament.
pub type TournamentHandle = Arc<Mutex<Tournament>>;

/// Tournaments by id, each behind its own lock.
#[derive(Debug, Default)]
pub struct TournamentRegistry {
    tournaments: RwLock<HashMap<String, TournamentHandle>>,
}

impl TournamentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tournament, replacing one with the same id.
    pub fn insert(&self, tournament: Tournament) -> TournamentHandle {
        let id = tournament.id().to_string();
        let handle = Arc::new(Mutex::new(tournament));
        self.tournaments
            .write()
            .insert(id, Arc::clone(&handle));
        handle
    }

    /// Handle to tournament `id`.
    pub fn get(&self, id: &str) -> Result<TournamentHandle, Error> {
        self.tournaments
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownTournament(id.to_string()))
    }

    /// Unregisters tournament `id`, returning its handle.
    pub fn remove(&self, id: &str) -> Option<TournamentHandle> {
        self.tournaments
            .write()
            .remove(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tournaments
            .read()
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Runs `f` with exclusive access to tournament `id`.
    pub fn with<R>(&self, id: &str, f: impl FnOnce(&mut Tournament) -> R) -> Result<R, Error> {
        let handle = self.get(id)?;
        let mut tournament = handle.lock();
        Ok(f(&mut tournament))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::NodeState;
    use crate::error::BracketStateError;
    use chrono::NaiveTime;
    use std::thread;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn tournament(id: &str) -> Tournament {
        let teams = vec![
            Team::new("Ants", "A", 1),
            Team::new("Apes", "A", 2),
            Team::new("Bees", "B", 1),
            Team::new("Bats", "B", 2),
        ];
        Tournament::new(id, teams, vec![Court::daily("C1", 1, hm(9, 0), hm(18, 0))])
            .with_config(SchedulerConfig::default().greedy_only())
    }

    fn win(w: &str, l: &str) -> CompletedResult {
        CompletedResult::forfeit(w, l).unwrap()
    }

    #[test]
    fn test_pools_then_bracket() {
        let mut t = tournament("cup");
        assert_eq!(t.pool_matches().len(), 2);
        let ids: Vec<MatchId> = t.pool_matches().iter().map(|m| m.id.clone()).collect();

        // Placeholder bracket before pool play ends
        let bracket = t.generate_bracket().unwrap();
        assert_eq!(bracket.in_state(NodeState::Pending).len(), 3);
        assert_eq!(t.matches().len(), 5);

        t.submit_result(&ids[0], win("Apes", "Ants")).unwrap();
        t.submit_result(&ids[1], win("Bees", "Bats")).unwrap();
        assert!(t.pools_complete());
        assert_eq!(t.resolve_bracket_seeds().unwrap(), 4);

        // #1 A vs #2 B
        let first = MatchId::from_raw("WB-R1-M1");
        let node = t.bracket().unwrap().node(&first).unwrap();
        assert_eq!(node.team(0), Some("Apes"));
        assert_eq!(node.team(1), Some("Bats"));

        t.start_match(&first).unwrap();
        let progress = t.submit_result(&first, win("Apes", "Bats")).unwrap().unwrap();
        assert!(!progress.replaced);
        assert!(t.results().get(&first).is_some());
    }

    #[test]
    fn test_rejected_bracket_result_is_not_stored() {
        let mut t = tournament("cup");
        t.generate_bracket().unwrap();
        let err = t
            .submit_result(&MatchId::from_raw("WB-R2-M1"), win("Ants", "Bees"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BracketState(BracketStateError::NotReady { .. })
        ));
        assert!(t.results().is_empty());

        assert!(matches!(
            t.submit_result(&MatchId::from_raw("nope"), win("Ants", "Bees")),
            Err(Error::UnknownMatch(_))
        ));
    }

    #[test]
    fn test_pool_result_team_check() {
        let mut t = tournament("cup");
        let id = t.pool_matches()[0].id.clone();
        assert!(matches!(
            t.submit_result(&id, win("Ants", "Bees")),
            Err(Error::Result(ResultError::WrongTeams(_)))
        ));
    }

    #[test]
    fn test_schedule_and_enrich() {
        let mut t = tournament("cup");
        let run = t.schedule();
        assert_eq!(run.summary.scheduled, 2);
        let rows = t.enriched_results();
        assert!(rows.iter().all(|r| r.court.as_deref() == Some("C1")));
        assert!(rows.iter().all(|r| r.result == MatchResult::Pending));
    }

    #[test]
    fn test_registry_isolates_tournaments() {
        let registry = Arc::new(TournamentRegistry::new());
        registry.insert(tournament("north"));
        registry.insert(tournament("south"));
        assert_eq!(registry.ids(), vec!["north".to_string(), "south".to_string()]);

        let workers: Vec<_> = ["north", "south"]
            .into_iter()
            .map(|id| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry
                        .with(id, |t| {
                            let m = t.pool_matches()[0].id.clone();
                            t.submit_result(&m, win("Ants", "Apes")).map(|_| ())
                        })
                        .unwrap()
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }

        for id in ["north", "south"] {
            let count = registry.with(id, |t| t.results().len()).unwrap();
            assert_eq!(count, 1);
        }
        assert!(registry.remove("north").is_some());
        assert!(matches!(registry.get("north"), Err(Error::UnknownTournament(_))));
    }
}
