//! Raw per-source candidate records and merged cross-source profiles.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw candidate as one source returned it.
///
/// Created by a source plugin and never mutated after return. The `id` is
/// unique only within its `platform`; cross-source identity is resolved
/// later by the deduplication engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Source tag, e.g. "github", "linkedin".
    pub platform: String,

    /// Identifier unique within the platform.
    pub id: String,

    pub name: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,

    #[serde(default)]
    pub skills: Vec<String>,

    /// Contact identifiers used for identity resolution.
    pub email: Option<String>,
    pub username: Option<String>,
    pub profile_url: Option<String>,

    /// Platform reputation signals. Each platform fills what it has.
    pub followers: Option<u32>,
    pub reputation: Option<u32>,
    pub connections: Option<u32>,
    pub stars: Option<u32>,
    pub forks: Option<u32>,

    pub years_experience: Option<f32>,
    pub last_active: Option<DateTime<Utc>>,

    /// When this record was collected.
    pub collected_at: DateTime<Utc>,

    /// The plugin's own data-completeness estimate, 0-100. A per-source
    /// guess, reconciled later by scoring; never authoritative ranking.
    pub initial_confidence: u8,

    /// Platform-specific leftovers that fit no typed field.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl CandidateRecord {
    /// Create a record with the minimal required fields.
    pub fn new(platform: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            id: id.into(),
            name: None,
            title: None,
            location: None,
            skills: vec![],
            email: None,
            username: None,
            profile_url: None,
            followers: None,
            reputation: None,
            connections: None,
            stars: None,
            forks: None,
            years_experience: None,
            last_active: None,
            collected_at: Utc::now(),
            initial_confidence: 0,
            extra: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_skills(mut self, skills: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skills = skills.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }

    pub fn with_followers(mut self, followers: u32) -> Self {
        self.followers = Some(followers);
        self
    }

    pub fn with_reputation(mut self, reputation: u32) -> Self {
        self.reputation = Some(reputation);
        self
    }

    pub fn with_connections(mut self, connections: u32) -> Self {
        self.connections = Some(connections);
        self
    }

    pub fn with_stars(mut self, stars: u32) -> Self {
        self.stars = Some(stars);
        self
    }

    pub fn with_forks(mut self, forks: u32) -> Self {
        self.forks = Some(forks);
        self
    }

    pub fn with_years_experience(mut self, years: f32) -> Self {
        self.years_experience = Some(years);
        self
    }

    pub fn with_last_active(mut self, at: DateTime<Utc>) -> Self {
        self.last_active = Some(at);
        self
    }

    pub fn with_collected_at(mut self, at: DateTime<Utc>) -> Self {
        self.collected_at = at;
        self
    }

    pub fn with_initial_confidence(mut self, confidence: u8) -> Self {
        self.initial_confidence = confidence.min(100);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Per-candidate feature scores and their weighted aggregate, 0-100 each.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skill_match: u8,
    pub experience: u8,
    pub reputation: u8,
    pub freshness: u8,
    pub social_proof: u8,
    pub overall: u8,
}

/// A merged, cross-source candidate profile.
///
/// Built during deduplication from one or more [`CandidateRecord`]s and
/// discarded at the end of the request; nothing at this layer persists
/// across searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    /// Synthetic profile id, unique within this search.
    pub id: String,

    pub name: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,

    /// Union of the source records' skills, deduplicated.
    pub skills: Vec<String>,

    /// Identity keys this profile was resolved on.
    pub identity_keys: Vec<String>,

    /// The raw records this profile was built from, keyed by platform.
    /// Insertion order reflects merge priority.
    pub records: IndexMap<String, CandidateRecord>,

    /// Platforms that contributed a record, in merge order.
    pub platforms_merged: Vec<String>,

    /// Identity-resolution confidence, 0-100.
    pub merge_confidence: u8,

    /// Is-this-a-real-active-person estimate, 0-100.
    pub authenticity_score: u8,

    /// Filled in by the score calculator.
    pub scores: Option<ScoreBreakdown>,
}

impl CandidateProfile {
    /// Overall score, 0 until the profile has been scored.
    pub fn overall_score(&self) -> u8 {
        self.scores.map(|s| s.overall).unwrap_or(0)
    }

    /// Most recent activity across all merged records.
    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.records.values().filter_map(|r| r.last_active).max()
    }

    /// Case-insensitive skill membership test.
    pub fn has_skill(&self, skill: &str) -> bool {
        let needle = skill.to_lowercase();
        self.skills.iter().any(|s| s.to_lowercase() == needle)
    }
}
