//! Source health monitoring.
//!
//! Caches availability and latency per source so the orchestrator can
//! skip or reorder sources without paying a probe on every request. The
//! monitor is advisory and fails open: when nothing is known-healthy the
//! full candidate list comes back rather than an empty one, because a
//! search with zero sources is strictly worse than a search against
//! possibly-flaky ones.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::budget::with_timeout;
use crate::query::{AI_ML_TERMS, BACKEND_TERMS};
use crate::traits::source::SourcePlugin;
use crate::types::query::ParsedQuery;

/// Health cache tuning.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// How long a probe result stays fresh.
    pub ttl: Duration,

    /// Deadline imposed on a single availability probe.
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            probe_timeout: Duration::from_millis(500),
        }
    }
}

/// Point-in-time view of one source's health.
#[derive(Debug, Clone)]
pub struct SourceHealth {
    pub available: bool,
    pub latency: Duration,
    /// Fraction of recorded search outcomes that succeeded, 1.0 when
    /// nothing has been recorded yet.
    pub success_rate: f64,
}

#[derive(Debug, Clone)]
struct ProbeEntry {
    available: bool,
    latency: Duration,
    checked_at: Instant,
}

#[derive(Debug, Default, Clone, Copy)]
struct Outcomes {
    attempts: u64,
    successes: u64,
}

impl Outcomes {
    fn rate(&self) -> f64 {
        if self.attempts == 0 {
            1.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

/// TTL-cached availability store, shared by `Arc` across searches.
#[derive(Debug)]
pub struct SourceHealthMonitor {
    config: HealthConfig,
    probes: RwLock<HashMap<String, ProbeEntry>>,
    outcomes: RwLock<HashMap<String, Outcomes>>,
}

impl Default for SourceHealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceHealthMonitor {
    pub fn new() -> Self {
        Self::with_config(HealthConfig::default())
    }

    pub fn with_config(config: HealthConfig) -> Self {
        Self {
            config,
            probes: RwLock::new(HashMap::new()),
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    /// Cached availability for one source, probing when the cache entry
    /// is missing or stale.
    pub async fn is_healthy(&self, plugin: &dyn SourcePlugin) -> bool {
        let name = plugin.name().to_string();

        if let Some(entry) = self.fresh_entry(&name) {
            return entry.available;
        }

        let start = Instant::now();
        let available = with_timeout(plugin.is_available(), self.config.probe_timeout)
            .await
            .unwrap_or(false);
        let latency = start.elapsed();

        debug!(source = %name, available, ?latency, "availability probe");
        self.probes.write().unwrap().insert(
            name,
            ProbeEntry {
                available,
                latency,
                checked_at: Instant::now(),
            },
        );
        available
    }

    /// Names of currently-healthy sources, failing open to the full list
    /// when none probe healthy.
    pub async fn available_sources(&self, plugins: &[Arc<dyn SourcePlugin>]) -> Vec<String> {
        let mut healthy = Vec::new();
        for plugin in plugins {
            if self.is_healthy(plugin.as_ref()).await {
                healthy.push(plugin.name().to_string());
            }
        }

        if healthy.is_empty() && !plugins.is_empty() {
            warn!("no source probed healthy, failing open to all sources");
            return plugins.iter().map(|p| p.name().to_string()).collect();
        }
        healthy
    }

    /// Reorder sources toward ones historically strong for the query's
    /// inferred intent, pushing chronically failing sources to the back.
    /// Purely advisory; nothing is removed.
    pub fn recommended_order(&self, parsed: &ParsedQuery, sources: Vec<String>) -> Vec<String> {
        let preference: &[&str] = if self.matches_intent(parsed, AI_ML_TERMS) {
            &["github", "stackoverflow", "linkedin", "google"]
        } else if self.matches_intent(parsed, BACKEND_TERMS) {
            &["stackoverflow", "github", "linkedin", "google"]
        } else {
            return self.demote_failing(sources);
        };

        let rank = |name: &str| {
            preference
                .iter()
                .position(|p| *p == name)
                .unwrap_or(preference.len())
        };
        let mut ordered = sources;
        ordered.sort_by_key(|name| rank(name));
        self.demote_failing(ordered)
    }

    /// Record the outcome of an actual search call against a source.
    pub fn record_outcome(&self, source: &str, success: bool) {
        let mut outcomes = self.outcomes.write().unwrap();
        let entry = outcomes.entry(source.to_string()).or_default();
        entry.attempts += 1;
        if success {
            entry.successes += 1;
        }
    }

    /// Current snapshot for a source, if it has been probed.
    pub fn snapshot(&self, source: &str) -> Option<SourceHealth> {
        let probe = self.probes.read().unwrap().get(source).cloned()?;
        let rate = self
            .outcomes
            .read()
            .unwrap()
            .get(source)
            .copied()
            .unwrap_or_default()
            .rate();
        Some(SourceHealth {
            available: probe.available,
            latency: probe.latency,
            success_rate: rate,
        })
    }

    fn fresh_entry(&self, source: &str) -> Option<ProbeEntry> {
        self.probes
            .read()
            .unwrap()
            .get(source)
            .filter(|e| e.checked_at.elapsed() < self.config.ttl)
            .cloned()
    }

    fn matches_intent(&self, parsed: &ParsedQuery, terms: &[&str]) -> bool {
        parsed
            .all_skills()
            .iter()
            .any(|skill| terms.contains(&skill.as_str()))
    }

    fn demote_failing(&self, sources: Vec<String>) -> Vec<String> {
        let outcomes = self.outcomes.read().unwrap();
        let failing = |name: &String| {
            outcomes
                .get(name)
                .map(|o| o.attempts >= 3 && o.rate() < 0.3)
                .unwrap_or(false)
        };
        let (ok, bad): (Vec<_>, Vec<_>) = sources.into_iter().partition(|s| !failing(s));
        ok.into_iter().chain(bad).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::enhance_query;
    use crate::testing::MockSourcePlugin;

    fn monitor_with_short_ttl() -> SourceHealthMonitor {
        SourceHealthMonitor::with_config(HealthConfig {
            ttl: Duration::from_millis(50),
            probe_timeout: Duration::from_millis(100),
        })
    }

    #[tokio::test]
    async fn test_probe_is_cached_within_ttl() {
        let monitor = SourceHealthMonitor::new();
        let plugin = MockSourcePlugin::new("github");

        assert!(monitor.is_healthy(&plugin).await);
        assert!(monitor.is_healthy(&plugin).await);

        // Second call was served from cache.
        let probes = plugin
            .calls()
            .iter()
            .filter(|c| matches!(c, crate::testing::MockCall::IsAvailable))
            .count();
        assert_eq!(probes, 1);
    }

    #[tokio::test]
    async fn test_stale_entry_reprobes() {
        let monitor = monitor_with_short_ttl();
        let plugin = MockSourcePlugin::new("github");

        monitor.is_healthy(&plugin).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        monitor.is_healthy(&plugin).await;

        let probes = plugin
            .calls()
            .iter()
            .filter(|c| matches!(c, crate::testing::MockCall::IsAvailable))
            .count();
        assert_eq!(probes, 2);
    }

    #[tokio::test]
    async fn test_fails_open_when_nothing_healthy() {
        let monitor = SourceHealthMonitor::new();
        let plugins: Vec<Arc<dyn SourcePlugin>> = vec![
            Arc::new(MockSourcePlugin::new("github").unavailable()),
            Arc::new(MockSourcePlugin::new("linkedin").unavailable()),
        ];

        let sources = monitor.available_sources(&plugins).await;
        assert_eq!(sources, vec!["github", "linkedin"]);
    }

    #[tokio::test]
    async fn test_unhealthy_source_filtered_when_others_remain() {
        let monitor = SourceHealthMonitor::new();
        let plugins: Vec<Arc<dyn SourcePlugin>> = vec![
            Arc::new(MockSourcePlugin::new("github")),
            Arc::new(MockSourcePlugin::new("linkedin").unavailable()),
        ];

        let sources = monitor.available_sources(&plugins).await;
        assert_eq!(sources, vec!["github"]);
    }

    #[test]
    fn test_ai_queries_prefer_github() {
        let monitor = SourceHealthMonitor::new();
        let parsed = enhance_query("machine learning engineer", None);

        let ordered = monitor.recommended_order(
            &parsed,
            vec!["google".into(), "linkedin".into(), "github".into()],
        );
        assert_eq!(ordered[0], "github");
    }

    #[test]
    fn test_general_queries_keep_order() {
        let monitor = SourceHealthMonitor::new();
        let parsed = enhance_query("designer", None);

        let ordered =
            monitor.recommended_order(&parsed, vec!["linkedin".into(), "github".into()]);
        assert_eq!(ordered, vec!["linkedin", "github"]);
    }

    #[test]
    fn test_chronically_failing_source_demoted_not_dropped() {
        let monitor = SourceHealthMonitor::new();
        for _ in 0..4 {
            monitor.record_outcome("github", false);
        }
        let parsed = enhance_query("designer", None);

        let ordered =
            monitor.recommended_order(&parsed, vec!["github".into(), "linkedin".into()]);
        assert_eq!(ordered, vec!["linkedin", "github"]);
    }
}
