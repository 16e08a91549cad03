//! Tournament court scheduling and elimination brackets.
//!
//! Places pool and bracket matches on courts under hard constraints (court
//! windows, team windows, minimum breaks, daily caps), and runs single- and
//! double-elimination brackets from seeding to champion.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Team`, `Court`, `Match`, `MatchId`,
//!   `ConstraintSet`, `Schedule`, `Assignment`
//! - **`slots`**: Court-day windows discretized into start slots
//! - **`compiler`**: Declarations compiled into per-match candidate slots
//! - **`cp`**: Branch-and-bound optimizer with seeded restarts
//! - **`dispatching`**: Match priority rules for the greedy scheduler
//! - **`scheduler`**: Scheduling runs, greedy fallback, KPIs
//! - **`bracket`**: Bracket generation and progression
//! - **`pool`**: Round-robin generation and standings
//! - **`results`**: Result storage keyed by canonical match id
//! - **`tournament`**: Per-tournament context and registry
//! - **`validation`**: Input integrity checks (duplicates, feeder cycles)
//! - **`config`**, **`error`**: Scheduler configuration, error types
//!
//! # Time
//!
//! Times are minutes on a tournament axis: day `d`, minute `m` of that day
//! is `d * 1440 + m`.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

pub mod bracket;
pub mod compiler;
pub mod config;
pub mod cp;
pub mod dispatching;
pub mod error;
pub mod models;
pub mod pool;
pub mod results;
pub mod scheduler;
pub mod slots;
pub mod tournament;
pub mod validation;

pub use error::Error;
