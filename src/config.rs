//! Search budget and selection parameters.

use std::time::Duration;

/// Configuration for one Monte Carlo tree search.
///
/// The search stops as soon as either the time or the iteration ceiling is reached.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Wall-clock ceiling for a single search, polled once per iteration.
    pub time_limit: Duration,

    /// Maximum number of select/simulate/backpropagate iterations.
    pub iteration_limit: u32,

    /// Exploration constant of the UCB1 formula.
    pub exploration: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(10),
            iteration_limit: 10_000,
            exploration: 1.41,
        }
    }
}

impl SearchConfig {
    /// Create a small budget for tests and demos.
    pub fn for_testing() -> Self {
        Self {
            time_limit: Duration::from_secs(5),
            iteration_limit: 300,
            ..Self::default()
        }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_iteration_limit(mut self, iteration_limit: u32) -> Self {
        self.iteration_limit = iteration_limit;
        self
    }
}
