//! Parsed query representation.

use serde::{Deserialize, Serialize};

/// Seniority level inferred from the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Lead,
    Principal,
}

/// Structured interpretation of a free-text query.
///
/// Produced once by the query enhancer and treated as immutable for the
/// rest of the request: downstream stages read it, none mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// The query exactly as the caller wrote it.
    pub original: String,

    /// Skill terms matched verbatim in the query.
    pub skills: Vec<String>,

    /// Semantically expanded skills (cluster members of matched terms).
    pub expanded_skills: Vec<String>,

    /// Location phrases matched verbatim.
    pub locations: Vec<String>,

    /// Canonical forms of the matched locations.
    pub normalized_locations: Vec<String>,

    /// Canonical role types, e.g. "engineer", "data scientist".
    pub role_types: Vec<String>,

    /// Seniority, when a marker was present.
    pub seniority: Option<Seniority>,

    /// Human-readable reading of the query, for display.
    pub interpretation: String,

    /// How confident the enhancer is in its extraction, 0-100.
    pub confidence: u8,
}

impl ParsedQuery {
    /// All skill terms, raw matches first, expansions after, deduplicated.
    pub fn all_skills(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.skills
            .iter()
            .chain(self.expanded_skills.iter())
            .filter(|s| seen.insert(s.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Primary normalized location, if any was found.
    pub fn primary_location(&self) -> Option<&str> {
        self.normalized_locations.first().map(String::as_str)
    }
}
