//! Inbound search requests.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Longest query we accept, in characters.
pub const MAX_QUERY_LEN: usize = 512;

/// Largest result limit a caller may request.
pub const MAX_RESULT_LIMIT: usize = 100;

/// A candidate search request.
///
/// Validated before any I/O happens; an invalid request fails fast with
/// [`SearchError::InvalidRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query, e.g. "senior React developer in Berlin".
    pub query: String,

    /// Optional location hint, merged with locations found in the query.
    pub location: Option<String>,

    /// Post-ranking filters.
    #[serde(default)]
    pub filters: SearchFilters,

    /// Source names to search. Empty means "all registered sources".
    #[serde(default)]
    pub sources: Vec<String>,

    /// Maximum number of ranked candidates to return.
    pub limit: usize,
}

impl SearchRequest {
    /// Create a request with default limit and no filters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
            filters: SearchFilters::default(),
            sources: vec![],
            limit: 25,
        }
    }

    /// Set the location hint.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Restrict the search to specific sources.
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sources = sources.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set post-ranking filters.
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Reject malformed requests before any I/O.
    pub fn validate(&self) -> Result<(), SearchError> {
        let trimmed = self.query.trim();
        if trimmed.is_empty() {
            return Err(SearchError::InvalidRequest {
                reason: "query must not be empty".into(),
            });
        }
        if trimmed.chars().count() > MAX_QUERY_LEN {
            return Err(SearchError::InvalidRequest {
                reason: format!("query exceeds {MAX_QUERY_LEN} characters"),
            });
        }
        if self.limit == 0 || self.limit > MAX_RESULT_LIMIT {
            return Err(SearchError::InvalidRequest {
                reason: format!("limit must be between 1 and {MAX_RESULT_LIMIT}"),
            });
        }
        Ok(())
    }
}

/// Filters applied to the ranked candidate list.
///
/// - `min_score` drops candidates below an overall score.
/// - `skills` keeps candidates sharing at least one listed skill.
/// - `active_within_days` keeps candidates seen active inside the window;
///   candidates with no known activity are dropped when this is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub min_score: Option<u8>,

    #[serde(default)]
    pub skills: Vec<String>,

    pub active_within_days: Option<u32>,
}

impl SearchFilters {
    /// Create an empty filter set (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a minimum overall score.
    pub fn with_min_score(mut self, score: u8) -> Self {
        self.min_score = Some(score);
        self
    }

    /// Require at least one of these skills.
    pub fn with_skills(mut self, skills: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skills = skills.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Require activity within the last `days` days.
    pub fn with_recency(mut self, days: u32) -> Self {
        self.active_within_days = Some(days);
        self
    }

    /// True when no filter is set.
    pub fn is_empty(&self) -> bool {
        self.min_score.is_none() && self.skills.is_empty() && self.active_within_days.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        let request = SearchRequest::new("React developer").with_limit(10);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_query_rejected() {
        let request = SearchRequest::new("   ");
        assert!(matches!(
            request.validate(),
            Err(SearchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_oversized_query_rejected() {
        let request = SearchRequest::new("x".repeat(MAX_QUERY_LEN + 1));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_limit_bounds() {
        assert!(SearchRequest::new("rust").with_limit(0).validate().is_err());
        assert!(SearchRequest::new("rust")
            .with_limit(MAX_RESULT_LIMIT + 1)
            .validate()
            .is_err());
        assert!(SearchRequest::new("rust")
            .with_limit(MAX_RESULT_LIMIT)
            .validate()
            .is_ok());
    }
}
