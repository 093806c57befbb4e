//! The search orchestrator.
//!
//! One `search()` call runs the whole pipeline under a wall-clock
//! budget. Per-source failures degrade the result instead of failing it;
//! the only request-level errors are a malformed request, zero eligible
//! sources before dispatch, and a violated merge invariant. Once
//! collection has started, the caller always gets a `SearchResult`.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::breaker::{classify_error, CircuitBreakerRegistry};
use crate::budget::TimeBudget;
use crate::cache::SearchCache;
use crate::dedup::deduplicate;
use crate::error::{ErrorKind, Result, SearchError};
use crate::executor::{execute_with_limits, ExecutionLimits, Task, TaskResult};
use crate::health::SourceHealthMonitor;
use crate::query::enhance_query;
use crate::scoring::rank;
use crate::traits::persistence::{CandidateSink, NoopSink, PersistContext};
use crate::traits::source::{SearchContext, SourcePlugin, SourceResponse};
use crate::traits::telemetry::{NoopEvents, SearchEvents};
use crate::types::candidate::{CandidateProfile, CandidateRecord};
use crate::types::config::SearchConfig;
use crate::types::request::{SearchFilters, SearchRequest};
use crate::types::result::{SearchMetadata, SearchResult, ServiceStatus, SourceErrorReport};

/// Coordinates source plugins, shared stores, and collaborators for the
/// public search call.
///
/// Shared stores (health monitor, breaker registry, cache) are injected
/// and `Arc`-shared, so several orchestrators - or several concurrent
/// searches on one orchestrator - observe the same source history.
pub struct SearchOrchestrator {
    plugins: Vec<Arc<dyn SourcePlugin>>,
    health: Arc<SourceHealthMonitor>,
    breakers: Arc<CircuitBreakerRegistry>,
    cache: Arc<SearchCache>,
    sink: Arc<dyn CandidateSink>,
    events: Arc<dyn SearchEvents>,
    config: SearchConfig,
}

impl SearchOrchestrator {
    /// Create an orchestrator with default stores and no-op
    /// collaborators.
    pub fn new(plugins: Vec<Arc<dyn SourcePlugin>>) -> Self {
        Self {
            plugins,
            health: Arc::new(SourceHealthMonitor::new()),
            breakers: Arc::new(CircuitBreakerRegistry::new()),
            cache: Arc::new(SearchCache::new()),
            sink: Arc::new(NoopSink),
            events: Arc::new(NoopEvents),
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_health(mut self, health: Arc<SourceHealthMonitor>) -> Self {
        self.health = health;
        self
    }

    pub fn with_breakers(mut self, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = breakers;
        self
    }

    pub fn with_cache(mut self, cache: Arc<SearchCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn CandidateSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn SearchEvents>) -> Self {
        self.events = events;
        self
    }

    /// Run one search end to end.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResult> {
        request.validate()?;

        let search_id = Uuid::new_v4();
        let started = Instant::now();

        let fingerprint =
            self.cache
                .fingerprint(&request.query, request.location.as_deref(), &request.sources);
        if self.config.cache_results {
            if let Some(mut hit) = self.cache.get(&fingerprint) {
                info!(%search_id, "serving search from cache");
                hit.metadata.from_cache = true;
                return Ok(hit);
            }
        }

        let parsed = enhance_query(&request.query, request.location.as_deref());
        debug!(
            %search_id,
            confidence = parsed.confidence,
            interpretation = %parsed.interpretation,
            "query enhanced"
        );

        let selected = match self.select_sources(&request, &parsed).await {
            Ok(selected) => selected,
            Err(err) => {
                self.emit_failed(search_id, &err);
                return Err(err);
            }
        };
        info!(%search_id, sources = ?selected, "sources selected");

        self.emit_started(search_id, &request.query);

        let budget = TimeBudget::new(self.config.total_budget)
            .with_good_enough(self.config.good_enough_candidates);
        let ctx = Arc::new(SearchContext {
            query: request.query.clone(),
            location: request.location.clone(),
            parsed: parsed.clone(),
            limit: request.limit,
        });

        let collection = self.collect(&selected, &ctx, &budget).await;

        let priorities: HashMap<String, u8> = self
            .plugins
            .iter()
            .map(|p| (p.name().to_string(), p.priority()))
            .collect();
        let outcome = match deduplicate(collection.records, &priorities) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.emit_failed(search_id, &err);
                return Err(err);
            }
        };

        let mut profiles = outcome.profiles;
        rank(&mut profiles, &parsed, Utc::now());
        apply_filters(&mut profiles, &request.filters);
        profiles.truncate(request.limit);

        let persist_failures = self.persist(&profiles, search_id, &request.query).await;

        let degraded = !collection.errors.is_empty();
        let result = SearchResult {
            metadata: SearchMetadata {
                search_id,
                original_count: outcome.original_count,
                deduplicated_count: outcome.deduplicated_count,
                duplicates_found: outcome.duplicates_found,
                sources_used: collection.sources_used,
                errors: collection.errors,
                processing_time_ms: started.elapsed().as_millis() as u64,
                interpretation: parsed.interpretation.clone(),
                confidence: parsed.confidence,
                service_status: if degraded {
                    ServiceStatus::Degraded
                } else {
                    ServiceStatus::Ok
                },
                fallback_used: degraded,
                from_cache: false,
                persist_failures,
            },
            candidates: profiles,
        };

        self.emit_completed(search_id, result.candidates.len(), started);

        if self.config.cache_results && result.is_clean() {
            self.cache.set(fingerprint, result.clone());
        }

        info!(
            %search_id,
            candidates = result.candidates.len(),
            duplicates = result.metadata.duplicates_found,
            degraded,
            elapsed_ms = result.metadata.processing_time_ms,
            "search complete"
        );
        Ok(result)
    }

    /// Requested ∩ registered, breaker-gated, health-ordered.
    ///
    /// Health filtering fails open inside the monitor; only "nothing
    /// registered matches the request" or "every breaker rejects" is
    /// fatal here.
    async fn select_sources(
        &self,
        request: &SearchRequest,
        parsed: &crate::types::query::ParsedQuery,
    ) -> Result<Vec<String>> {
        let requested: Vec<Arc<dyn SourcePlugin>> = if request.sources.is_empty() {
            self.plugins.clone()
        } else {
            for name in &request.sources {
                if !self.plugins.iter().any(|p| p.name() == name.as_str()) {
                    warn!(source = %name, "requested source is not registered, skipping");
                }
            }
            self.plugins
                .iter()
                .filter(|p| request.sources.iter().any(|s| s == p.name()))
                .cloned()
                .collect()
        };
        if requested.is_empty() {
            return Err(SearchError::NoAvailableSources);
        }

        let admitted: Vec<Arc<dyn SourcePlugin>> = requested
            .into_iter()
            .filter(|p| {
                let allowed = self.breakers.can_execute(p.name());
                if !allowed {
                    debug!(source = p.name(), "circuit open, source skipped");
                }
                allowed
            })
            .collect();
        if admitted.is_empty() {
            return Err(SearchError::NoAvailableSources);
        }

        let healthy = self.health.available_sources(&admitted).await;
        Ok(self.health.recommended_order(parsed, healthy))
    }

    /// Dispatch the selected sources in waves of `max_concurrent`,
    /// re-checking the budget's early-exit policy between waves.
    async fn collect(
        &self,
        selected: &[String],
        ctx: &Arc<SearchContext>,
        budget: &TimeBudget,
    ) -> Collection {
        let mut collection = Collection::default();

        for wave in selected.chunks(self.config.max_concurrent.max(1)) {
            if !budget.should_continue_collection(collection.records.len()) {
                debug!(
                    collected = collection.records.len(),
                    remaining_ms = budget.remaining().as_millis() as u64,
                    "collection stopped early"
                );
                break;
            }
            let deadline = budget.source_deadline();
            if deadline.is_zero() {
                break;
            }

            let tasks: Vec<Task<SourceResponse>> = wave
                .iter()
                .filter_map(|name| self.plugin(name))
                .map(|plugin| {
                    let ctx = Arc::clone(ctx);
                    let cancel = CancellationToken::new();
                    let observed = cancel.clone();
                    let name = plugin.name().to_string();
                    Task::with_cancel(name, cancel, async move {
                        plugin.search(&ctx, observed).await
                    })
                })
                .collect();

            let limits = ExecutionLimits {
                timeout: deadline,
                max_concurrent: self.config.max_concurrent,
            };
            for settled in execute_with_limits(tasks, &limits).await {
                self.settle(settled, &mut collection);
            }
        }
        collection
    }

    /// Fold one task outcome into the collection, updating breaker and
    /// health history.
    fn settle(&self, settled: TaskResult<SourceResponse>, collection: &mut Collection) {
        let source = settled.name.clone();
        match settled.payload {
            Some(response) => {
                self.breakers.record_success(&source);
                self.health.record_outcome(&source, true);

                let plugin = self.plugin(&source);
                let before = response.candidates.len();
                let mut accepted: Vec<CandidateRecord> = response
                    .candidates
                    .into_iter()
                    .filter(|record| {
                        plugin
                            .as_ref()
                            .map(|p| p.validate_result(record))
                            .unwrap_or(true)
                    })
                    .collect();
                if accepted.len() < before {
                    debug!(
                        source = %source,
                        dropped = before - accepted.len(),
                        "records failed validation"
                    );
                }

                info!(
                    source = %source,
                    accepted = accepted.len(),
                    fetched = response.metadata.fetched,
                    duration_ms = settled.duration.as_millis() as u64,
                    "source settled"
                );
                collection.records.append(&mut accepted);
                collection.sources_used.push(source);
            }
            None => {
                let message = settled
                    .error
                    .unwrap_or_else(|| "unknown failure".to_string());
                let kind = classify_error(&message);

                self.health.record_outcome(&source, false);
                // Budget-imposed timeouts are not the source's fault;
                // everything else counts against its breaker.
                if kind != ErrorKind::Timeout {
                    self.breakers.record_failure(&source);
                }

                warn!(source = %source, %kind, %message, "source failed");
                collection.errors.push(SourceErrorReport {
                    source,
                    kind,
                    message,
                });
            }
        }
    }

    async fn persist(
        &self,
        profiles: &[CandidateProfile],
        search_id: Uuid,
        query: &str,
    ) -> usize {
        let ctx = PersistContext {
            search_id,
            query: query.to_string(),
        };
        let mut failures = 0;
        for profile in profiles {
            if let Err(err) = self.sink.save(profile, &ctx).await {
                warn!(profile = %profile.id, %err, "failed to persist candidate");
                failures += 1;
            }
        }
        failures
    }

    fn plugin(&self, name: &str) -> Option<Arc<dyn SourcePlugin>> {
        self.plugins.iter().find(|p| p.name() == name).cloned()
    }

    fn emit_started(&self, search_id: Uuid, query: &str) {
        let events = Arc::clone(&self.events);
        let query = query.to_string();
        tokio::spawn(async move {
            events.search_started(search_id, &query).await;
        });
    }

    fn emit_completed(&self, search_id: Uuid, candidates: usize, started: Instant) {
        let events = Arc::clone(&self.events);
        let elapsed = started.elapsed();
        tokio::spawn(async move {
            events.search_completed(search_id, candidates, elapsed).await;
        });
    }

    fn emit_failed(&self, search_id: Uuid, error: &SearchError) {
        let events = Arc::clone(&self.events);
        let message = error.to_string();
        tokio::spawn(async move {
            events.search_failed(search_id, &message).await;
        });
    }
}

#[derive(Default)]
struct Collection {
    records: Vec<CandidateRecord>,
    sources_used: Vec<String>,
    errors: Vec<SourceErrorReport>,
}

fn apply_filters(profiles: &mut Vec<CandidateProfile>, filters: &SearchFilters) {
    if filters.is_empty() {
        return;
    }
    if let Some(min_score) = filters.min_score {
        profiles.retain(|p| p.overall_score() >= min_score);
    }
    if !filters.skills.is_empty() {
        profiles.retain(|p| filters.skills.iter().any(|skill| p.has_skill(skill)));
    }
    if let Some(days) = filters.active_within_days {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        profiles.retain(|p| p.last_active().map(|at| at >= cutoff).unwrap_or(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_record, MemorySink, MockSourcePlugin};

    fn orchestrator_with(plugins: Vec<Arc<dyn SourcePlugin>>) -> SearchOrchestrator {
        SearchOrchestrator::new(plugins).with_config(
            SearchConfig::new().with_total_budget(std::time::Duration::from_secs(6)),
        )
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_any_io() {
        let plugin = Arc::new(
            MockSourcePlugin::new("github")
                .with_candidates(vec![sample_record("github", "1", "Alice Smith")]),
        );
        let orchestrator = orchestrator_with(vec![plugin.clone() as Arc<dyn SourcePlugin>]);

        let result = orchestrator.search(SearchRequest::new("")).await;
        assert!(matches!(result, Err(SearchError::InvalidRequest { .. })));
        assert!(plugin.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_requested_sources_are_fatal_when_none_match() {
        let orchestrator = orchestrator_with(vec![Arc::new(MockSourcePlugin::new("github"))
            as Arc<dyn SourcePlugin>]);

        let request = SearchRequest::new("rust").with_sources(["does-not-exist"]);
        let result = orchestrator.search(request).await;
        assert!(matches!(result, Err(SearchError::NoAvailableSources)));
    }

    #[tokio::test]
    async fn test_validation_drops_garbage_records() {
        // One record has no name/username/email and must not survive.
        let plugin = Arc::new(MockSourcePlugin::new("github").with_candidates(vec![
            sample_record("github", "1", "Alice Smith"),
            CandidateRecord::new("github", "github_2"),
        ]));
        let orchestrator = orchestrator_with(vec![plugin as Arc<dyn SourcePlugin>]);

        let result = orchestrator
            .search(SearchRequest::new("rust developer"))
            .await
            .unwrap();
        assert_eq!(result.metadata.original_count, 1);
    }

    #[tokio::test]
    async fn test_persist_failures_counted_not_fatal() {
        let plugin = Arc::new(
            MockSourcePlugin::new("github")
                .with_candidates(vec![sample_record("github", "1", "Alice Smith")]),
        );
        let orchestrator = orchestrator_with(vec![plugin as Arc<dyn SourcePlugin>])
            .with_sink(Arc::new(crate::testing::FailingSink));

        let result = orchestrator
            .search(SearchRequest::new("rust developer"))
            .await
            .unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.metadata.persist_failures, 1);
    }

    #[tokio::test]
    async fn test_successful_search_persists_candidates() {
        let plugin = Arc::new(
            MockSourcePlugin::new("github")
                .with_candidates(vec![sample_record("github", "1", "Alice Smith")]),
        );
        let sink = Arc::new(MemorySink::new());
        let orchestrator =
            orchestrator_with(vec![plugin as Arc<dyn SourcePlugin>]).with_sink(sink.clone());

        orchestrator
            .search(SearchRequest::new("rust developer"))
            .await
            .unwrap();
        assert_eq!(sink.saved_count(), 1);
    }

    #[tokio::test]
    async fn test_min_score_filter_applies_after_ranking() {
        let plugin = Arc::new(
            MockSourcePlugin::new("github")
                .with_candidates(vec![sample_record("github", "1", "Alice Smith")]),
        );
        let orchestrator = orchestrator_with(vec![plugin as Arc<dyn SourcePlugin>]);

        let request = SearchRequest::new("rust developer")
            .with_filters(SearchFilters::new().with_min_score(100));
        let result = orchestrator.search(request).await.unwrap();
        assert!(result.candidates.is_empty());
        // Dedup counts still reflect what was collected.
        assert_eq!(result.metadata.original_count, 1);
    }
}
