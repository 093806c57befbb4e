//! The search pipeline.
//!
//! [`SearchOrchestrator`] wires the engine together: cache probe, query
//! enhancement, source selection, bounded concurrent collection,
//! deduplication, scoring, persistence, and telemetry.

mod orchestrator;

pub use orchestrator::SearchOrchestrator;
