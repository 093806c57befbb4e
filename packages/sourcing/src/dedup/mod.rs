//! Cross-source identity resolution and field-level merge.
//!
//! Records are linked through any shared identity key (multi-key
//! progressive matching over a union-find), then each linked group is
//! merged into one [`CandidateProfile`]: skills unioned, scalar fields
//! resolved first-non-null in source-priority order with recency breaking
//! priority ties. Records that offer no linkable key keep their random
//! fallback key and survive as single-record profiles; they are never
//! silently dropped.
//!
//! Every outcome is validated before it leaves this module: a merge that
//! claims more profiles than input records is a bug, not a result.

pub mod identity;

pub use identity::{IdentityKey, KeyKind};

use chrono::Utc;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::types::candidate::{CandidateProfile, CandidateRecord};
use identity::identity_keys;

/// Record of one merge the engine performed.
#[derive(Debug, Clone)]
pub struct MergeDecision {
    pub profile_id: String,
    pub platforms: Vec<String>,
    pub matched_on: Vec<KeyKind>,
    pub confidence: u8,
}

/// The engine's full output for one batch of records.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub profiles: Vec<CandidateProfile>,
    pub original_count: usize,
    pub deduplicated_count: usize,
    pub duplicates_found: usize,
    pub merge_decisions: Vec<MergeDecision>,
}

/// Resolve cross-source identities and merge duplicates.
///
/// `priorities` maps platform name to plugin priority; unknown platforms
/// default to 50. Profiles come back in discovery order of their first
/// record, which later keeps ranking ties stable.
pub fn deduplicate(
    records: Vec<CandidateRecord>,
    priorities: &HashMap<String, u8>,
) -> Result<DedupOutcome> {
    let original_count = records.len();
    let keys_per_record: Vec<Vec<IdentityKey>> = records.iter().map(identity_keys).collect();

    // Link records through shared keys.
    let mut parent: Vec<usize> = (0..records.len()).collect();
    let mut owner: HashMap<String, usize> = HashMap::new();
    for (index, keys) in keys_per_record.iter().enumerate() {
        for key in keys.iter().filter(|k| k.kind != KeyKind::Fallback) {
            match owner.entry(key.as_str()) {
                std::collections::hash_map::Entry::Occupied(entry) => {
                    union(&mut parent, index, *entry.get());
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(index);
                }
            }
        }
    }

    // Collect groups in first-appearance order.
    let mut groups: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for index in 0..records.len() {
        let root = find(&mut parent, index);
        groups.entry(root).or_default().push(index);
    }

    let mut profiles = Vec::with_capacity(groups.len());
    let mut merge_decisions = Vec::new();
    for members in groups.values() {
        let profile = merge_group(members, &records, &keys_per_record, priorities);
        if members.len() > 1 {
            merge_decisions.push(MergeDecision {
                profile_id: profile.id.clone(),
                platforms: profile.platforms_merged.clone(),
                matched_on: matched_kinds(members, &keys_per_record),
                confidence: profile.merge_confidence,
            });
        }
        profiles.push(profile);
    }

    let deduplicated_count = profiles.len();
    let duplicates_found = original_count.checked_sub(deduplicated_count).ok_or_else(|| {
        SearchError::DedupInvariant {
            reason: format!(
                "merge produced {deduplicated_count} profiles from {original_count} records"
            ),
        }
    })?;

    debug!(
        original_count,
        deduplicated_count, duplicates_found, "deduplication complete"
    );

    Ok(DedupOutcome {
        profiles,
        original_count,
        deduplicated_count,
        duplicates_found,
        merge_decisions,
    })
}

fn find(parent: &mut Vec<usize>, index: usize) -> usize {
    let mut root = index;
    while parent[root] != root {
        root = parent[root];
    }
    // Path compression.
    let mut walk = index;
    while parent[walk] != root {
        let next = parent[walk];
        parent[walk] = root;
        walk = next;
    }
    root
}

fn union(parent: &mut Vec<usize>, a: usize, b: usize) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        // Lower index wins so group order tracks discovery order.
        let (keep, absorb) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        parent[absorb] = keep;
    }
}

fn merge_group(
    members: &[usize],
    records: &[CandidateRecord],
    keys_per_record: &[Vec<IdentityKey>],
    priorities: &HashMap<String, u8>,
) -> CandidateProfile {
    // Resolution order: strongest source first, recency breaking ties.
    let mut ordered: Vec<usize> = members.to_vec();
    ordered.sort_by(|&a, &b| {
        let pa = priorities.get(&records[a].platform).copied().unwrap_or(50);
        let pb = priorities.get(&records[b].platform).copied().unwrap_or(50);
        pb.cmp(&pa)
            .then_with(|| records[b].collected_at.cmp(&records[a].collected_at))
    });

    let mut merged_records: IndexMap<String, CandidateRecord> = IndexMap::new();
    let mut skills: Vec<String> = Vec::new();
    let mut seen_skills: HashSet<String> = HashSet::new();
    let mut name = None;
    let mut title = None;
    let mut location = None;
    let mut email = None;

    for &index in &ordered {
        let record = &records[index];
        merged_records
            .entry(record.platform.clone())
            .or_insert_with(|| record.clone());

        for skill in &record.skills {
            if seen_skills.insert(skill.to_lowercase()) {
                skills.push(skill.clone());
            }
        }
        name = name.or_else(|| record.name.clone());
        title = title.or_else(|| record.title.clone());
        location = location.or_else(|| record.location.clone());
        email = email.or_else(|| record.email.clone());
    }

    let platforms_merged: Vec<String> = merged_records.keys().cloned().collect();

    let mut identity_key_strings: Vec<String> = Vec::new();
    for &index in members {
        for key in keys_per_record[index]
            .iter()
            .filter(|k| k.kind != KeyKind::Fallback)
        {
            let rendered = key.as_str();
            if !identity_key_strings.contains(&rendered) {
                identity_key_strings.push(rendered);
            }
        }
    }

    let matched = matched_kinds(members, keys_per_record);
    let merge_confidence = merge_confidence(members.len(), &matched);
    let authenticity_score = authenticity_score(
        name.is_some(),
        title.is_some(),
        location.is_some(),
        email.is_some(),
        &merged_records,
    );

    CandidateProfile {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        title,
        location,
        email,
        skills,
        identity_keys: identity_key_strings,
        records: merged_records,
        platforms_merged,
        merge_confidence,
        authenticity_score,
        scores: None,
    }
}

/// Kinds whose normalized value at least two group members share.
fn matched_kinds(members: &[usize], keys_per_record: &[Vec<IdentityKey>]) -> Vec<KeyKind> {
    let mut matched = Vec::new();
    for kind in [
        KeyKind::Email,
        KeyKind::Username,
        KeyKind::ProfileUrl,
        KeyKind::Name,
    ] {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &index in members {
            for key in &keys_per_record[index] {
                if key.kind == kind {
                    *counts.entry(key.value.as_str()).or_default() += 1;
                }
            }
        }
        if counts.values().any(|&n| n >= 2) {
            matched.push(kind);
        }
    }
    matched
}

/// Single-record profiles are trivially confident. Merged profiles score
/// by the strongest matching key kind plus a small bonus per additional
/// corroborating kind.
fn merge_confidence(group_size: usize, matched: &[KeyKind]) -> u8 {
    if group_size <= 1 {
        return 100;
    }
    let strongest = matched.iter().map(|k| k.points()).max().unwrap_or(40);
    let bonus = 5 * matched.len().saturating_sub(1) as u8;
    strongest.saturating_add(bonus).min(100)
}

/// Is-this-a-real-active-person estimate from field completeness,
/// cross-source corroboration, and recency of activity.
fn authenticity_score(
    has_name: bool,
    has_title: bool,
    has_location: bool,
    has_email: bool,
    records: &IndexMap<String, CandidateRecord>,
) -> u8 {
    let mut score: u32 = 20;
    if has_name {
        score += 15;
    }
    if has_title {
        score += 10;
    }
    if has_location {
        score += 10;
    }
    if has_email {
        score += 15;
    }
    if records.len() >= 2 {
        score += 20;
    }
    let recently_active = records.values().filter_map(|r| r.last_active).any(|at| {
        Utc::now()
            .signed_duration_since(at)
            .num_days()
            .unsigned_abs()
            <= 90
    });
    if recently_active {
        score += 10;
    }
    score.min(100) as u8
}
