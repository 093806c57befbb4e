//! Helpers shared across source plugins.
//!
//! These are free functions rather than base-class machinery: every
//! plugin composes the pieces it needs.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

use crate::types::candidate::CandidateRecord;

/// An API token that won't leak through logs or debug output.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret for an actual API request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Record id scoped to its platform, e.g. `github_583231`.
pub fn candidate_id(platform: &str, native_id: &str) -> String {
    format!("{platform}_{native_id}")
}

/// Trim, collapse whitespace, and strip control characters from a
/// provider-supplied value.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First email-shaped token in a block of text, if any.
pub fn extract_email(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '.'))
        .find(|token| {
            let Some(at) = token.find('@') else {
                return false;
            };
            at > 0 && token[at + 1..].contains('.') && !token[at + 1..].contains('@')
        })
        .map(|token| token.to_lowercase())
}

/// Query skill terms that appear verbatim in a candidate-supplied text
/// blob (a bio, a headline, a snippet).
pub fn skills_in_text(text: &str, skill_terms: &[String]) -> Vec<String> {
    let haystack = text.to_lowercase();
    skill_terms
        .iter()
        .filter(|term| haystack.contains(term.to_lowercase().as_str()))
        .cloned()
        .collect()
}

/// The minimum a record needs to be worth scoring: a platform tag, an
/// in-source id, and at least one human-recognizable identifier.
pub fn has_minimum_fields(record: &CandidateRecord) -> bool {
    if record.platform.trim().is_empty() || record.id.trim().is_empty() {
        return false;
    }
    record.name.as_deref().map(str::trim).is_some_and(|n| !n.is_empty())
        || record
            .username
            .as_deref()
            .map(str::trim)
            .is_some_and(|u| !u.is_empty())
        || record.email.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_never_prints() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{secret}"), "[REDACTED]");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_sanitize_collapses_and_strips() {
        assert_eq!(sanitize("  Alice\t\u{0000} Smith \n"), "Alice Smith");
    }

    #[test]
    fn test_extract_email() {
        assert_eq!(
            extract_email("reach me at Alice@Example.com, thanks"),
            Some("alice@example.com".to_string())
        );
        assert_eq!(extract_email("no contact info here"), None);
    }

    #[test]
    fn test_skills_in_text() {
        let terms = vec!["rust".to_string(), "python".to_string()];
        let found = skills_in_text("Rust enthusiast and occasional Gopher", &terms);
        assert_eq!(found, vec!["rust"]);
    }

    #[test]
    fn test_minimum_fields() {
        assert!(has_minimum_fields(
            &CandidateRecord::new("github", "1").with_username("alice")
        ));
        assert!(!has_minimum_fields(&CandidateRecord::new("github", "1")));
        assert!(!has_minimum_fields(
            &CandidateRecord::new("", "1").with_name("Alice")
        ));
    }
}
