//! Core trait abstractions.
//!
//! - [`source`] - The uniform source plugin contract
//! - [`persistence`] - The candidate persistence collaborator
//! - [`telemetry`] - The fire-and-forget event sink

pub mod persistence;
pub mod source;
pub mod telemetry;

pub use persistence::{CandidateSink, NoopSink, PersistContext};
pub use source::{SearchContext, SourceMetadata, SourcePlugin, SourceResponse};
pub use telemetry::{NoopEvents, SearchEvents};
