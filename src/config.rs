//! Scheduler configuration.
//!
//! Every field has a default, so a partial TOML table (or none at all)
//! yields a usable configuration:
//!
//! ```
//! use u_tournament::config::SchedulerConfig;
//!
//! let config = SchedulerConfig::from_toml_str("time_budget_ms = 500").unwrap();
//! assert_eq!(config.time_budget_ms, 500);
//! assert!(config.use_optimizer);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigurationError;

/// Tuning knobs for a scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Optimizer wall-clock budget (ms).
    pub time_budget_ms: u64,
    /// Hard cap on optimizer search nodes per run.
    pub node_limit: u64,
    /// Node budget of the first restart; doubles on every restart.
    pub restart_nodes: u64,
    /// Seed for restart tie-break shuffles.
    pub seed: u64,
    /// How much later than the earliest option the greedy scheduler may
    /// finish to avoid a near-consecutive placement (minutes).
    pub makespan_tolerance_min: i64,
    /// Run the optimizer first. When false the greedy scheduler runs alone.
    pub use_optimizer: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: 60_000,
            node_limit: 2_000_000,
            restart_nodes: 20_000,
            seed: 0x5EED,
            makespan_tolerance_min: 30,
            use_optimizer: true,
        }
    }
}

impl SchedulerConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(text).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Sets the optimizer time budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the optimizer node cap.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = nodes;
        self
    }

    /// Sets the restart seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Disables the optimizer (greedy only).
    pub fn greedy_only(mut self) -> Self {
        self.use_optimizer = false;
        self
    }

    /// Optimizer budget as a `Duration`.
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SchedulerConfig::default();
        assert_eq!(c.time_budget(), Duration::from_secs(60));
        assert!(c.use_optimizer);
    }

    #[test]
    fn test_from_toml() {
        let c = SchedulerConfig::from_toml_str(
            r#"
            time_budget_ms = 250
            seed = 7
            use_optimizer = false
            "#,
        )
        .unwrap();
        assert_eq!(c.time_budget_ms, 250);
        assert_eq!(c.seed, 7);
        assert!(!c.use_optimizer);
        assert_eq!(c.restart_nodes, 20_000);
    }

    #[test]
    fn test_bad_toml() {
        let err = SchedulerConfig::from_toml_str("time_budget_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn test_builders() {
        let c = SchedulerConfig::default()
            .with_time_budget(Duration::from_millis(20))
            .with_node_limit(10)
            .with_seed(3)
            .greedy_only();
        assert_eq!(c.time_budget_ms, 20);
        assert_eq!(c.node_limit, 10);
        assert_eq!(c.seed, 3);
        assert!(!c.use_optimizer);
    }
}
