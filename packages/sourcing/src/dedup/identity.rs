//! Identity key extraction and normalization.
//!
//! Keys are namespaced so values from different kinds can never collide
//! in the match map ("email:a@x.com" vs "name:a x com").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::candidate::CandidateRecord;

/// Kind of evidence an identity key carries, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Case-folded, trimmed email address.
    Email,
    /// Platform-qualified username, e.g. `github:alice`.
    Username,
    /// Host-qualified profile URL slug, e.g. `github.com/alice`.
    ProfileUrl,
    /// Normalized full name: lowercased, punctuation stripped,
    /// whitespace collapsed.
    Name,
    /// Per-record random key. Never matches anything.
    Fallback,
}

impl KeyKind {
    /// Merge-confidence points this kind of match contributes.
    pub fn points(self) -> u8 {
        match self {
            KeyKind::Email => 90,
            KeyKind::Username => 75,
            KeyKind::ProfileUrl => 60,
            KeyKind::Name => 40,
            KeyKind::Fallback => 0,
        }
    }
}

/// One identity key: kind plus normalized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub kind: KeyKind,
    pub value: String,
}

impl IdentityKey {
    /// Namespaced form used for matching and display.
    pub fn as_str(&self) -> String {
        let prefix = match self.kind {
            KeyKind::Email => "email",
            KeyKind::Username => "user",
            KeyKind::ProfileUrl => "url",
            KeyKind::Name => "name",
            KeyKind::Fallback => "fallback",
        };
        format!("{prefix}:{}", self.value)
    }
}

/// Priority-ordered identity keys for one record.
///
/// A record offering none of email, username, URL, or name gets a random
/// fallback key, so it survives deduplication as its own profile instead
/// of being dropped or accidentally merged.
pub fn identity_keys(record: &CandidateRecord) -> Vec<IdentityKey> {
    let mut keys = Vec::new();

    if let Some(email) = record.email.as_deref().and_then(normalize_email) {
        keys.push(IdentityKey {
            kind: KeyKind::Email,
            value: email,
        });
    }
    if let Some(username) = record.username.as_deref() {
        let username = username.trim().to_lowercase();
        if !username.is_empty() {
            keys.push(IdentityKey {
                kind: KeyKind::Username,
                value: format!("{}:{}", record.platform, username),
            });
        }
    }
    if let Some(slug) = record.profile_url.as_deref().and_then(profile_slug) {
        keys.push(IdentityKey {
            kind: KeyKind::ProfileUrl,
            value: slug,
        });
    }
    if let Some(name) = record.name.as_deref().and_then(normalize_name) {
        keys.push(IdentityKey {
            kind: KeyKind::Name,
            value: name,
        });
    }

    if keys.is_empty() {
        keys.push(IdentityKey {
            kind: KeyKind::Fallback,
            value: Uuid::new_v4().to_string(),
        });
    }
    keys
}

/// Case-fold and trim an email; reject values that cannot be one.
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    let at = email.find('@')?;
    if at == 0 || at == email.len() - 1 || !email[at + 1..].contains('.') {
        return None;
    }
    Some(email)
}

/// Lowercase, strip punctuation, collapse whitespace. Single-token names
/// are rejected: "alice" alone is far too weak to merge on.
pub fn normalize_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.split_whitespace().count() < 2 {
        return None;
    }
    Some(collapsed)
}

/// Host-qualified final path segment of a profile URL.
pub fn profile_slug(profile_url: &str) -> Option<String> {
    let parsed = url::Url::parse(profile_url).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").to_lowercase();
    let slug = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_lowercase();
    if slug.is_empty() {
        return None;
    }
    Some(format!("{host}/{slug}"))
}
