//! Testing utilities including mock implementations.
//!
//! These make it possible to exercise the full orchestration pipeline
//! without touching a real provider: configurable candidates, latency,
//! failure modes, and call tracking for assertions.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{SinkError, SourceError, SourceResult};
use crate::traits::persistence::{CandidateSink, PersistContext};
use crate::traits::source::{SearchContext, SourcePlugin, SourceResponse};
use crate::traits::telemetry::SearchEvents;
use crate::types::candidate::{CandidateProfile, CandidateRecord};

/// Record of a call made to a [`MockSourcePlugin`].
#[derive(Debug, Clone)]
pub enum MockCall {
    IsAvailable,
    Search { query: String },
    Validate { id: String },
}

/// A configurable source plugin for tests.
///
/// Deliberately ignores the cancellation token while sleeping: that
/// models a plugin that never observes cancellation, which is exactly
/// the case the executor's best-effort contract has to absorb.
pub struct MockSourcePlugin {
    name: String,
    priority: u8,
    available: RwLock<bool>,
    candidates: RwLock<Vec<CandidateRecord>>,
    delay: RwLock<Option<Duration>>,
    failure: RwLock<Option<SourceError>>,
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl MockSourcePlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 50,
            available: RwLock::new(true),
            candidates: RwLock::new(vec![]),
            delay: RwLock::new(None),
            failure: RwLock::new(None),
            calls: Arc::new(RwLock::new(vec![])),
        }
    }

    /// Candidates every search call returns.
    pub fn with_candidates(self, candidates: Vec<CandidateRecord>) -> Self {
        *self.candidates.write().unwrap() = candidates;
        self
    }

    /// Simulated provider latency per search call.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap() = Some(delay);
        self
    }

    /// Make every search call fail with this error.
    pub fn failing_with(self, error: SourceError) -> Self {
        *self.failure.write().unwrap() = Some(error);
        self
    }

    /// Make the availability probe report unhealthy.
    pub fn unavailable(self) -> Self {
        *self.available.write().unwrap() = false;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// All calls made to this mock.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of search calls made.
    pub fn search_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Search { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.calls.write().unwrap().push(call);
    }
}

#[async_trait]
impl SourcePlugin for MockSourcePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        self.record(MockCall::IsAvailable);
        *self.available.read().unwrap()
    }

    async fn search(
        &self,
        ctx: &SearchContext,
        _cancel: CancellationToken,
    ) -> SourceResult<SourceResponse> {
        self.record(MockCall::Search {
            query: ctx.query.clone(),
        });

        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.read().unwrap().clone();
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(SourceResponse::new(self.candidates.read().unwrap().clone()))
    }

    fn validate_result(&self, record: &CandidateRecord) -> bool {
        self.record(MockCall::Validate {
            id: record.id.clone(),
        });
        crate::sources::util::has_minimum_fields(record)
    }
}

/// A sink that remembers everything it was asked to save.
#[derive(Default)]
pub struct MemorySink {
    saved: RwLock<Vec<(CandidateProfile, PersistContext)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_count(&self) -> usize {
        self.saved.read().unwrap().len()
    }

    pub fn saved_profiles(&self) -> Vec<CandidateProfile> {
        self.saved
            .read()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[async_trait]
impl CandidateSink for MemorySink {
    async fn save(
        &self,
        profile: &CandidateProfile,
        ctx: &PersistContext,
    ) -> Result<(), SinkError> {
        self.saved
            .write()
            .unwrap()
            .push((profile.clone(), ctx.clone()));
        Ok(())
    }
}

/// A sink that always fails, for exercising degraded persistence.
#[derive(Default)]
pub struct FailingSink;

#[async_trait]
impl CandidateSink for FailingSink {
    async fn save(
        &self,
        _profile: &CandidateProfile,
        _ctx: &PersistContext,
    ) -> Result<(), SinkError> {
        Err(SinkError::Storage("disk on fire".into()))
    }
}

/// One event captured by [`RecordingEvents`].
#[derive(Debug, Clone)]
pub enum RecordedEvent {
    Started { search_id: Uuid, query: String },
    Completed { search_id: Uuid, candidates: usize },
    Failed { search_id: Uuid, error: String },
}

/// An event sink that captures everything for assertions.
#[derive(Default)]
pub struct RecordingEvents {
    events: RwLock<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().unwrap().clone()
    }

    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RecordedEvent::Started { .. }))
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RecordedEvent::Completed { .. }))
            .count()
    }
}

#[async_trait]
impl SearchEvents for RecordingEvents {
    async fn search_started(&self, search_id: Uuid, query: &str) {
        self.events.write().unwrap().push(RecordedEvent::Started {
            search_id,
            query: query.to_string(),
        });
    }

    async fn search_completed(&self, search_id: Uuid, candidates: usize, _elapsed: Duration) {
        self.events
            .write()
            .unwrap()
            .push(RecordedEvent::Completed {
                search_id,
                candidates,
            });
    }

    async fn search_failed(&self, search_id: Uuid, error: &str) {
        self.events.write().unwrap().push(RecordedEvent::Failed {
            search_id,
            error: error.to_string(),
        });
    }
}

/// A ready-made candidate record for tests.
pub fn sample_record(platform: &str, id: &str, name: &str) -> CandidateRecord {
    CandidateRecord::new(platform, format!("{platform}_{id}"))
        .with_name(name)
        .with_username(name.to_lowercase().replace(' ', "-"))
        .with_skills(["rust", "python"])
        .with_initial_confidence(50)
}
