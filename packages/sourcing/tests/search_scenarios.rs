//! End-to-end scenarios for the search pipeline.
//!
//! These drive the full orchestrator against mock plugins: healthy
//! fan-out, per-source timeouts, cross-source merging, circuit-open
//! rejection, caching, and telemetry.

use std::sync::Arc;
use std::time::Duration;

use sourcing::testing::{sample_record, MemorySink, MockSourcePlugin, RecordingEvents};
use sourcing::{
    CandidateRecord, CircuitBreakerRegistry, ErrorKind, SearchCache, SearchConfig, SearchError,
    SearchOrchestrator, SearchRequest, ServiceStatus, SourceError, SourcePlugin,
};

/// A batch of distinct, valid records for one platform.
fn records_for(platform: &str, count: usize) -> Vec<CandidateRecord> {
    (0..count)
        .map(|i| sample_record(platform, &i.to_string(), &format!("{platform} Person{i}")))
        .collect()
}

fn quick_config() -> SearchConfig {
    SearchConfig::new().with_total_budget(Duration::from_secs(6))
}

#[tokio::test]
async fn test_healthy_fanout_returns_ranked_deduplicated_set() {
    // Two healthy plugins with disjoint candidate sets of 6 and 5.
    let github = Arc::new(
        MockSourcePlugin::new("github").with_candidates(records_for("github", 6)),
    );
    let stackoverflow = Arc::new(
        MockSourcePlugin::new("stackoverflow").with_candidates(records_for("stackoverflow", 5)),
    );
    let orchestrator = SearchOrchestrator::new(vec![github, stackoverflow])
        .with_config(quick_config());

    let request = SearchRequest::new("React developer")
        .with_sources(["github", "stackoverflow"])
        .with_limit(10);
    let result = orchestrator.search(request).await.unwrap();

    assert_eq!(result.metadata.original_count, 11);
    assert!(result.metadata.deduplicated_count <= 11);
    assert!(result.candidates.len() <= 10);
    assert_eq!(result.metadata.service_status, ServiceStatus::Ok);
    assert!(!result.metadata.fallback_used);

    // Sorted descending by overall score.
    let scores: Vec<u8> = result
        .candidates
        .iter()
        .map(|c| c.overall_score())
        .collect();
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(scores, sorted);
}

#[tokio::test]
async fn test_slow_source_times_out_and_others_carry_the_search() {
    // A 1.8s total budget allots 300ms per source; the slow plugin
    // sleeps well past that.
    let slow = Arc::new(
        MockSourcePlugin::new("linkedin")
            .with_candidates(records_for("linkedin", 3))
            .with_delay(Duration::from_millis(700)),
    );
    let fast = Arc::new(
        MockSourcePlugin::new("github").with_candidates(records_for("github", 2)),
    );

    let breakers = Arc::new(CircuitBreakerRegistry::new());
    let orchestrator = SearchOrchestrator::new(vec![fast, slow])
        .with_breakers(breakers.clone())
        .with_config(SearchConfig::new().with_total_budget(Duration::from_millis(1800)));

    let result = orchestrator
        .search(SearchRequest::new("React developer"))
        .await
        .unwrap();

    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.metadata.sources_used, vec!["github"]);
    assert_eq!(result.metadata.service_status, ServiceStatus::Degraded);
    assert!(result.metadata.fallback_used);

    let timeout = result
        .metadata
        .errors
        .iter()
        .find(|e| e.source == "linkedin")
        .expect("slow source should appear in errors");
    assert_eq!(timeout.kind, ErrorKind::Timeout);

    // A budget-imposed timeout does not count against the breaker.
    assert_eq!(breakers.failure_count("linkedin"), 0);
}

#[tokio::test]
async fn test_shared_email_merges_across_sources() {
    let github = Arc::new(MockSourcePlugin::new("github").with_candidates(vec![
        sample_record("github", "1", "Alice Smith").with_email("a@x.com"),
    ]));
    let linkedin = Arc::new(MockSourcePlugin::new("linkedin").with_candidates(vec![
        sample_record("linkedin", "9", "A. Smith").with_email("A@X.COM"),
    ]));
    let orchestrator =
        SearchOrchestrator::new(vec![github, linkedin]).with_config(quick_config());

    let result = orchestrator
        .search(SearchRequest::new("React developer"))
        .await
        .unwrap();

    assert_eq!(result.metadata.original_count, 2);
    assert_eq!(result.metadata.deduplicated_count, 1);
    assert_eq!(result.metadata.duplicates_found, 1);

    let merged = &result.candidates[0];
    assert_eq!(merged.platforms_merged.len(), 2);
    assert!(merged.merge_confidence >= 90);
}

#[tokio::test]
async fn test_all_breakers_open_is_fatal() {
    let breakers = Arc::new(CircuitBreakerRegistry::new());
    for _ in 0..5 {
        breakers.record_failure("github");
    }

    let plugin = Arc::new(
        MockSourcePlugin::new("github").with_candidates(records_for("github", 3)),
    );
    let orchestrator = SearchOrchestrator::new(vec![plugin.clone()])
        .with_breakers(breakers)
        .with_config(quick_config());

    let result = orchestrator.search(SearchRequest::new("rust")).await;
    assert!(matches!(result, Err(SearchError::NoAvailableSources)));
    assert_eq!(plugin.search_count(), 0);
}

#[tokio::test]
async fn test_total_source_failure_degrades_instead_of_throwing() {
    let a = Arc::new(
        MockSourcePlugin::new("github")
            .failing_with(SourceError::Network("connection refused".into())),
    );
    let b = Arc::new(
        MockSourcePlugin::new("stackoverflow")
            .failing_with(SourceError::Authentication("401 unauthorized".into())),
    );

    let breakers = Arc::new(CircuitBreakerRegistry::new());
    let orchestrator = SearchOrchestrator::new(vec![a, b])
        .with_breakers(breakers.clone())
        .with_config(quick_config());

    let result = orchestrator
        .search(SearchRequest::new("React developer"))
        .await
        .unwrap();

    assert!(result.candidates.is_empty());
    assert_eq!(result.metadata.errors.len(), 2);
    assert_eq!(result.metadata.service_status, ServiceStatus::Degraded);

    let kinds: Vec<ErrorKind> = result.metadata.errors.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&ErrorKind::Network));
    assert!(kinds.contains(&ErrorKind::Authentication));

    // Real failures do count against the breakers.
    assert_eq!(breakers.failure_count("github"), 1);
    assert_eq!(breakers.failure_count("stackoverflow"), 1);
}

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() {
    let plugin = Arc::new(
        MockSourcePlugin::new("github").with_candidates(records_for("github", 3)),
    );
    let cache = Arc::new(SearchCache::new());
    let orchestrator = SearchOrchestrator::new(vec![plugin.clone()])
        .with_cache(cache)
        .with_config(quick_config());

    let first = orchestrator
        .search(SearchRequest::new("React developer"))
        .await
        .unwrap();
    assert!(!first.metadata.from_cache);

    let second = orchestrator
        .search(SearchRequest::new("developer React"))
        .await
        .unwrap();
    assert!(second.metadata.from_cache);
    assert_eq!(second.candidates.len(), first.candidates.len());

    // The fingerprint matched, so the plugin only ever ran once.
    assert_eq!(plugin.search_count(), 1);
}

#[tokio::test]
async fn test_good_enough_count_stops_later_waves() {
    let first = Arc::new(
        MockSourcePlugin::new("github").with_candidates(records_for("github", 5)),
    );
    let second = Arc::new(
        MockSourcePlugin::new("stackoverflow").with_candidates(records_for("stackoverflow", 5)),
    );

    // One source per wave, and five candidates is already good enough.
    let config = SearchConfig::new()
        .with_total_budget(Duration::from_secs(6))
        .with_max_concurrent(1)
        .with_good_enough_candidates(5);
    let orchestrator =
        SearchOrchestrator::new(vec![first.clone(), second.clone()]).with_config(config);

    let result = orchestrator
        .search(SearchRequest::new("designer please"))
        .await
        .unwrap();

    assert_eq!(first.search_count(), 1);
    assert_eq!(second.search_count(), 0);
    assert_eq!(result.metadata.original_count, 5);
}

#[tokio::test]
async fn test_lifecycle_events_are_emitted() {
    let plugin = Arc::new(
        MockSourcePlugin::new("github").with_candidates(records_for("github", 2)),
    );
    let events = Arc::new(RecordingEvents::new());
    let orchestrator = SearchOrchestrator::new(vec![plugin])
        .with_events(events.clone())
        .with_config(quick_config());

    orchestrator
        .search(SearchRequest::new("React developer"))
        .await
        .unwrap();

    // Events are fire-and-forget; give the detached tasks a beat.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(events.started_count(), 1);
    assert_eq!(events.completed_count(), 1);
}

#[tokio::test]
async fn test_sink_receives_ranked_profiles() {
    let github = Arc::new(MockSourcePlugin::new("github").with_candidates(vec![
        sample_record("github", "1", "Alice Smith").with_email("a@x.com"),
    ]));
    let linkedin = Arc::new(MockSourcePlugin::new("linkedin").with_candidates(vec![
        sample_record("linkedin", "9", "Alice Smith").with_email("a@x.com"),
    ]));

    let sink = Arc::new(MemorySink::new());
    let orchestrator = SearchOrchestrator::new(vec![github, linkedin])
        .with_sink(sink.clone())
        .with_config(quick_config());

    orchestrator
        .search(SearchRequest::new("React developer"))
        .await
        .unwrap();

    let saved = sink.saved_profiles();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].platforms_merged.len(), 2);
    assert!(saved[0].scores.is_some());
}

#[tokio::test]
async fn test_unregistered_requested_sources_are_ignored_when_others_match() {
    let plugin: Arc<dyn SourcePlugin> = Arc::new(
        MockSourcePlugin::new("github").with_candidates(records_for("github", 2)),
    );
    let orchestrator = SearchOrchestrator::new(vec![plugin]).with_config(quick_config());

    let request = SearchRequest::new("rust developer").with_sources(["github", "myspace"]);
    let result = orchestrator.search(request).await.unwrap();
    assert_eq!(result.metadata.sources_used, vec!["github"]);
}
