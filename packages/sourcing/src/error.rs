//! Typed errors for the sourcing library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Request-level failures
//! (`SearchError`) abort a search; per-source failures (`SourceError`)
//! are always recovered locally and surfaced in result metadata.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort an entire search request.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed request, rejected before any I/O.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Every plugin was unhealthy or circuit-open before dispatch.
    #[error("no sources available to serve this request")]
    NoAvailableSources,

    /// The merge produced an impossible count. Should never occur.
    #[error("deduplication invariant violated: {reason}")]
    DedupInvariant { reason: String },
}

/// Errors raised by a single source plugin.
///
/// These never propagate out of a search; they are classified, recorded
/// in `SearchMetadata::errors`, and the remaining sources continue.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The plugin exceeded its allotted time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Transport-level failure talking to the upstream provider.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream provider rejected our credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The upstream provider throttled us.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Anything else, verbatim.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_connect() {
            SourceError::Network(err.to_string())
        } else {
            SourceError::Other(err.to_string())
        }
    }
}

/// Failure reported by the persistence collaborator.
///
/// Persistence failures are logged and counted but never abort a search.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// Classification bucket for a per-source error.
///
/// Derived purely from message content, for observability. Classification
/// never changes circuit breaker transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Network,
    Authentication,
    RateLimit,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Result type alias for request-level operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Result type alias for per-source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
