//! The source plugin contract.
//!
//! Every external provider sits behind this trait; the orchestrator is
//! agnostic to which providers are registered. Shared helpers that would
//! live on a base class in inheritance-minded designs are free functions
//! in [`crate::sources::util`] instead.
//!
//! # Cancellation
//!
//! `search` receives a [`CancellationToken`] that fires when the
//! per-source time budget expires. Cancellation is advisory: the
//! orchestrator stops waiting either way, but a plugin that ignores the
//! token can leak in-flight work. Well-behaved plugins check it between
//! phases and select against it around long awaits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::SourceResult;
use crate::types::candidate::CandidateRecord;
use crate::types::query::ParsedQuery;

/// Per-request context handed to every plugin.
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// The caller's raw query text.
    pub query: String,

    /// Location hint, if the caller provided one.
    pub location: Option<String>,

    /// Structured interpretation of the query.
    pub parsed: ParsedQuery,

    /// Upper bound on candidates this source should return.
    pub limit: usize,
}

/// Provider-side details about one search call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Candidates the provider reported before any local filtering.
    pub fetched: usize,

    /// True when the provider had more results than the limit allowed.
    pub truncated: bool,

    /// Provider-observed latency, when the plugin measured one.
    pub provider_latency_ms: Option<u64>,
}

impl SourceMetadata {
    pub fn new(fetched: usize) -> Self {
        Self {
            fetched,
            truncated: false,
            provider_latency_ms: None,
        }
    }

    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.provider_latency_ms = Some(latency.as_millis() as u64);
        self
    }
}

/// What one plugin returns from a search call.
#[derive(Debug, Clone, Default)]
pub struct SourceResponse {
    pub candidates: Vec<CandidateRecord>,
    pub metadata: SourceMetadata,
}

impl SourceResponse {
    pub fn new(candidates: Vec<CandidateRecord>) -> Self {
        let metadata = SourceMetadata::new(candidates.len());
        Self {
            candidates,
            metadata,
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A provider-specific unit implementing the uniform search capability.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Stable source name, e.g. "github". Used as the platform tag and as
    /// the key into health and circuit breaker stores.
    fn name(&self) -> &str;

    /// Merge priority: when merged records disagree on a scalar field, the
    /// higher-priority source wins. Higher is stronger.
    fn priority(&self) -> u8 {
        50
    }

    /// Lightweight health probe. Must answer within a few hundred
    /// milliseconds; the health monitor enforces its own deadline on top.
    async fn is_available(&self) -> bool;

    /// Search the provider. May take seconds; must honor `cancel`.
    async fn search(
        &self,
        ctx: &SearchContext,
        cancel: CancellationToken,
    ) -> SourceResult<SourceResponse>;

    /// Minimum-field sanity check used to drop garbage before scoring.
    fn validate_result(&self, record: &CandidateRecord) -> bool {
        crate::sources::util::has_minimum_fields(record)
    }
}
