//! Multi-Source Candidate Search Orchestration Library
//!
//! A query-driven engine that fans a candidate search out across
//! unreliable external sources, merges the results into a deduplicated
//! ranked set, and does it all inside a hard wall-clock budget.
//!
//! # Design Philosophy
//!
//! **"Degrade, don't fail"**
//!
//! - Every source is optional; any one of them can vanish mid-search
//! - Partial results with honest metadata beat a perfect error
//! - Identity resolution is probabilistic, and says so
//! - Shared stores are injected, never module-level globals
//!
//! # Usage
//!
//! ```rust,ignore
//! use sourcing::{SearchOrchestrator, SearchRequest};
//! use sourcing::sources::{GithubPlugin, StackOverflowPlugin};
//! use std::sync::Arc;
//!
//! let orchestrator = SearchOrchestrator::new(vec![
//!     Arc::new(GithubPlugin::new().with_token(github_token)),
//!     Arc::new(StackOverflowPlugin::new()),
//! ]);
//!
//! let request = SearchRequest::new("senior React developer in Berlin")
//!     .with_limit(10);
//! let result = orchestrator.search(request).await?;
//!
//! for candidate in &result.candidates {
//!     println!("{:?}: {}", candidate.name, candidate.overall_score());
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (SourcePlugin, CandidateSink, SearchEvents)
//! - [`types`] - Requests, records, profiles, results, configuration
//! - [`query`] - Dictionary-driven query enhancement
//! - [`sources`] - Provider plugin implementations
//! - [`health`] - TTL-cached source availability
//! - [`breaker`] - Per-source circuit breaking and error classification
//! - [`executor`] - Bounded-concurrency task execution
//! - [`budget`] - Wall-clock budget allocation
//! - [`dedup`] - Cross-source identity resolution and merge
//! - [`scoring`] - Feature scoring and ranking
//! - [`cache`] - Fingerprinted result cache
//! - [`pipeline`] - The orchestrator
//! - [`testing`] - Mock implementations for testing

pub mod breaker;
pub mod budget;
pub mod cache;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod health;
pub mod pipeline;
pub mod query;
pub mod scoring;
pub mod sources;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ErrorKind, Result, SearchError, SinkError, SourceError, SourceResult};
pub use traits::{
    persistence::{CandidateSink, NoopSink, PersistContext},
    source::{SearchContext, SourceMetadata, SourcePlugin, SourceResponse},
    telemetry::{NoopEvents, SearchEvents},
};
pub use types::{
    candidate::{CandidateProfile, CandidateRecord, ScoreBreakdown},
    config::SearchConfig,
    query::{ParsedQuery, Seniority},
    request::{SearchFilters, SearchRequest},
    result::{SearchMetadata, SearchResult, ServiceStatus, SourceErrorReport},
};

// Re-export the orchestrator
pub use pipeline::SearchOrchestrator;

// Re-export engine components
pub use breaker::{classify_error, BreakerConfig, CircuitBreakerRegistry, CircuitState};
pub use budget::{with_timeout, TimeBudget};
pub use cache::{CacheConfig, SearchCache};
pub use dedup::{deduplicate, DedupOutcome, IdentityKey, KeyKind, MergeDecision};
pub use executor::{execute_with_limits, ExecutionLimits, Task, TaskResult};
pub use health::{HealthConfig, SourceHealth, SourceHealthMonitor};
pub use query::{enhance_query, significant_terms};
pub use scoring::{overall_score, rank, score_profile};

// Re-export source plugins
pub use sources::{GithubPlugin, GoogleSearchPlugin, LinkedInPlugin, StackOverflowPlugin};
