//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable knobs for one orchestrator instance.
///
/// Constructed once and injected; independent orchestrators can carry
/// different configurations without sharing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Total wall-clock allowance for one search request.
    #[serde(with = "duration_secs")]
    pub total_budget: Duration,

    /// Maximum source tasks in flight at once.
    pub max_concurrent: usize,

    /// Stop collecting once this many raw candidates have arrived.
    pub good_enough_candidates: usize,

    /// Cache successful results for later identical queries.
    pub cache_results: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            total_budget: Duration::from_secs(90),
            max_concurrent: 4,
            good_enough_candidates: 20,
            cache_results: true,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total_budget(mut self, budget: Duration) -> Self {
        self.total_budget = budget;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_good_enough_candidates(mut self, count: usize) -> Self {
        self.good_enough_candidates = count;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_results = false;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.total_budget, Duration::from_secs(90));
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.good_enough_candidates, 20);
    }

    #[test]
    fn test_max_concurrent_floor() {
        let config = SearchConfig::new().with_max_concurrent(0);
        assert_eq!(config.max_concurrent, 1);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = SearchConfig::new().with_total_budget(Duration::from_secs(30));
        let json = serde_json::to_string(&config).unwrap();
        let back: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_budget, Duration::from_secs(30));
    }
}
