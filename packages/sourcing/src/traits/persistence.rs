//! Persistence collaborator.
//!
//! The engine hands each accepted profile to a [`CandidateSink`]; what the
//! sink does with it (database rows, message queue, nothing) is the
//! application's business. Sink failures are logged and counted, never
//! fatal to the search.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SinkError;
use crate::types::candidate::CandidateProfile;

/// Per-search context passed along with each saved profile.
#[derive(Debug, Clone)]
pub struct PersistContext {
    pub search_id: Uuid,
    pub query: String,
}

/// Where accepted candidates go after ranking.
#[async_trait]
pub trait CandidateSink: Send + Sync {
    async fn save(&self, profile: &CandidateProfile, ctx: &PersistContext)
        -> Result<(), SinkError>;
}

/// A sink that discards everything. The default when the application does
/// not persist candidates.
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl CandidateSink for NoopSink {
    async fn save(
        &self,
        _profile: &CandidateProfile,
        _ctx: &PersistContext,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}
