//! Search results and per-search metadata.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::types::candidate::CandidateProfile;

/// Whether the search ran with its full source set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
}

/// One source's failure, classified for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceErrorReport {
    pub source: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Everything a caller needs to interpret a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub search_id: Uuid,

    /// Raw records collected across all sources, before deduplication.
    pub original_count: usize,

    /// Profiles after deduplication. Always <= `original_count`.
    pub deduplicated_count: usize,

    /// `original_count - deduplicated_count`.
    pub duplicates_found: usize,

    /// Sources that returned usable output.
    pub sources_used: Vec<String>,

    /// Per-source failures. Presence of any entry degrades the search.
    #[serde(default)]
    pub errors: Vec<SourceErrorReport>,

    pub processing_time_ms: u64,

    /// Human-readable reading of the query.
    pub interpretation: String,

    /// Query-enhancer confidence, 0-100.
    pub confidence: u8,

    pub service_status: ServiceStatus,

    /// True when at least one source failed but others carried the search.
    pub fallback_used: bool,

    /// True when the result was served from the query cache.
    pub from_cache: bool,

    /// Profiles the persistence collaborator failed to save.
    pub persist_failures: usize,
}

/// The ranked outcome of one search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Merged profiles, sorted descending by overall score.
    pub candidates: Vec<CandidateProfile>,
    pub metadata: SearchMetadata,
}

impl SearchResult {
    /// True when the search completed without any source failure.
    pub fn is_clean(&self) -> bool {
        self.metadata.errors.is_empty()
    }
}
