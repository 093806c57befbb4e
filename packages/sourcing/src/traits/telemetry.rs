//! Fire-and-forget search telemetry.
//!
//! The orchestrator emits start/complete/fail events per search id. They
//! are dispatched on detached tasks so a slow monitoring sink can never
//! stall a search, and any sink-side failure is simply dropped.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Consumer of search lifecycle events.
#[async_trait]
pub trait SearchEvents: Send + Sync {
    async fn search_started(&self, search_id: Uuid, query: &str);

    async fn search_completed(&self, search_id: Uuid, candidates: usize, elapsed: Duration);

    async fn search_failed(&self, search_id: Uuid, error: &str);
}

/// An event sink that ignores everything.
#[derive(Debug, Default)]
pub struct NoopEvents;

#[async_trait]
impl SearchEvents for NoopEvents {
    async fn search_started(&self, _search_id: Uuid, _query: &str) {}

    async fn search_completed(&self, _search_id: Uuid, _candidates: usize, _elapsed: Duration) {}

    async fn search_failed(&self, _search_id: Uuid, _error: &str) {}
}
