//! Query enhancement: free text in, [`ParsedQuery`] out.
//!
//! Pure dictionary matching with one-to-many skill expansion. No network
//! calls; deterministic given the dictionaries. An empty extraction still
//! yields a usable `ParsedQuery` with confidence 0 and the literal query
//! preserved for display.

mod dictionaries;

pub(crate) use dictionaries::{AI_ML_TERMS, BACKEND_TERMS, STOPWORDS};

use crate::types::query::{ParsedQuery, Seniority};
use dictionaries::{LOCATION_ALIASES, ROLE_TYPES, SENIORITY_MARKERS, SKILL_CLUSTERS};

/// Parse a free-text query into its structured interpretation.
pub fn enhance_query(query: &str, location_hint: Option<&str>) -> ParsedQuery {
    let padded = pad_terms(query);

    let mut skills = Vec::new();
    let mut expanded = Vec::new();
    for (term, cluster) in SKILL_CLUSTERS {
        if contains_phrase(&padded, term) {
            push_unique(&mut skills, term);
            for member in *cluster {
                if !skills.iter().any(|s| s == member) {
                    push_unique(&mut expanded, member);
                }
            }
        }
    }
    // Drop expansions that were also matched verbatim.
    expanded.retain(|e| !skills.contains(e));

    let mut locations = Vec::new();
    let mut normalized = Vec::new();
    for (alias, canonical) in LOCATION_ALIASES {
        if contains_phrase(&padded, alias) {
            push_unique(&mut locations, alias);
            push_unique(&mut normalized, canonical);
        }
    }
    if let Some(hint) = location_hint {
        let hint = hint.trim().to_lowercase();
        if !hint.is_empty() && !locations.contains(&hint) {
            let canonical = LOCATION_ALIASES
                .iter()
                .find(|(alias, _)| *alias == hint)
                .map(|(_, c)| (*c).to_string())
                .unwrap_or_else(|| hint.clone());
            locations.push(hint);
            push_unique(&mut normalized, &canonical);
        }
    }

    let mut role_types = Vec::new();
    for (phrase, canonical) in ROLE_TYPES {
        if contains_phrase(&padded, phrase) {
            push_unique(&mut role_types, canonical);
        }
    }

    let seniority = SENIORITY_MARKERS
        .iter()
        .find(|(marker, _)| contains_phrase(&padded, marker))
        .map(|(_, level)| *level);

    let confidence = confidence_for(&skills, &locations, &role_types);
    let interpretation = interpret(query, &skills, &role_types, &normalized, seniority);

    ParsedQuery {
        original: query.to_string(),
        skills,
        expanded_skills: expanded,
        locations,
        normalized_locations: normalized,
        role_types,
        seniority,
        interpretation,
        confidence,
    }
}

/// Significant query terms for cache fingerprinting: lowercased tokens
/// minus stopwords and one-character fragments.
pub fn significant_terms(query: &str) -> Vec<String> {
    let padded = pad_terms(query);
    let mut terms: Vec<String> = padded
        .split_whitespace()
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
        .map(String::from)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Lowercase the query and flatten punctuation to spaces, keeping `+` and
/// `#` so "c++" and "c#" survive, then pad for whole-phrase matching.
fn pad_terms(query: &str) -> String {
    let cleaned: String = query
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '+' || c == '#' || c == '.' || c == '/' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {phrase} "))
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Weighted sum of extraction hits, capped at 100: skills are worth the
/// most, then roles, then locations, with a bonus when several categories
/// agree the query is well-formed.
fn confidence_for(skills: &[String], locations: &[String], roles: &[String]) -> u8 {
    let mut confidence: u32 = 0;
    confidence += match skills.len() {
        0 => 0,
        1 => 25,
        _ => 40,
    };
    if !locations.is_empty() {
        confidence += 20;
    }
    if !roles.is_empty() {
        confidence += 25;
    }
    let categories = [!skills.is_empty(), !locations.is_empty(), !roles.is_empty()]
        .iter()
        .filter(|b| **b)
        .count();
    if categories >= 2 {
        confidence += 15;
    }
    confidence.min(100) as u8
}

fn interpret(
    original: &str,
    skills: &[String],
    roles: &[String],
    locations: &[String],
    seniority: Option<Seniority>,
) -> String {
    if skills.is_empty() && roles.is_empty() && locations.is_empty() {
        return original.to_string();
    }

    let mut parts = Vec::new();
    if let Some(level) = seniority {
        parts.push(format!("{level:?}").to_lowercase());
    }
    if !skills.is_empty() {
        parts.push(skills.join(", "));
    }
    parts.push(
        roles
            .first()
            .map(String::as_str)
            .unwrap_or("candidates")
            .to_string(),
    );
    if let Some(location) = locations.first() {
        parts.push(format!("in {location}"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_extraction_and_expansion() {
        let parsed = enhance_query("senior React developer in SF", None);
        assert!(parsed.skills.contains(&"react".to_string()));
        assert!(parsed.expanded_skills.contains(&"javascript".to_string()));
        assert_eq!(parsed.seniority, Some(Seniority::Senior));
        assert_eq!(parsed.normalized_locations, vec!["san francisco"]);
        assert!(parsed.role_types.contains(&"engineer".to_string()));
    }

    #[test]
    fn test_expansion_excludes_verbatim_matches() {
        let parsed = enhance_query("react and javascript developer", None);
        assert!(parsed.skills.contains(&"javascript".to_string()));
        assert!(!parsed.expanded_skills.contains(&"javascript".to_string()));
    }

    #[test]
    fn test_empty_extraction_preserves_query() {
        let parsed = enhance_query("somebody nice please", None);
        assert_eq!(parsed.confidence, 0);
        assert!(parsed.skills.is_empty());
        assert_eq!(parsed.interpretation, "somebody nice please");
    }

    #[test]
    fn test_location_hint_merged() {
        let parsed = enhance_query("rust engineer", Some("Berlin"));
        assert_eq!(parsed.normalized_locations, vec!["berlin"]);
    }

    #[test]
    fn test_confidence_is_capped_and_deterministic() {
        let a = enhance_query("senior machine learning engineer in london", None);
        let b = enhance_query("senior machine learning engineer in london", None);
        assert_eq!(a.confidence, b.confidence);
        assert!(a.confidence <= 100);
        assert!(a.confidence >= 60);
    }

    #[test]
    fn test_special_character_skills() {
        let parsed = enhance_query("c++ and c# developer", None);
        assert!(parsed.skills.contains(&"c++".to_string()));
        assert!(parsed.skills.contains(&"c#".to_string()));
    }

    #[test]
    fn test_significant_terms_sorted_and_deduped() {
        let terms = significant_terms("the React react developer for hire");
        assert_eq!(terms, vec!["developer", "hire", "react"]);
    }
}
