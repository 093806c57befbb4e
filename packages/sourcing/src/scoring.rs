//! Per-candidate feature scoring and ranking.
//!
//! Five feature scores on a 0-100 scale are combined with fixed weights
//! into an overall score. Ranking sorts descending by overall score with
//! a stable sort, so candidates that tie keep their discovery order.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::candidate::{CandidateProfile, ScoreBreakdown};
use crate::types::query::ParsedQuery;

/// Relative weight of each feature in the overall score.
const WEIGHT_SKILL: f64 = 0.35;
const WEIGHT_EXPERIENCE: f64 = 0.25;
const WEIGHT_REPUTATION: f64 = 0.20;
const WEIGHT_FRESHNESS: f64 = 0.10;
const WEIGHT_SOCIAL: f64 = 0.10;

/// Combine feature scores into the weighted overall score.
pub fn overall_score(
    skill_match: u8,
    experience: u8,
    reputation: u8,
    freshness: u8,
    social_proof: u8,
) -> u8 {
    let weighted = WEIGHT_SKILL * skill_match as f64
        + WEIGHT_EXPERIENCE * experience as f64
        + WEIGHT_REPUTATION * reputation as f64
        + WEIGHT_FRESHNESS * freshness as f64
        + WEIGHT_SOCIAL * social_proof as f64;
    (weighted.round() as u32).min(100) as u8
}

/// Score one profile against the parsed query.
///
/// `now` is injected so scoring stays deterministic under test.
pub fn score_profile(
    profile: &CandidateProfile,
    parsed: &ParsedQuery,
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let skill_match = skill_match_score(profile, parsed);
    let experience = experience_score(profile);
    let reputation = reputation_score(profile);
    let freshness = freshness_score(profile, now);
    let social_proof = social_proof_score(profile);

    ScoreBreakdown {
        skill_match,
        experience,
        reputation,
        freshness,
        social_proof,
        overall: overall_score(skill_match, experience, reputation, freshness, social_proof),
    }
}

/// Score every profile and sort descending by overall score.
pub fn rank(profiles: &mut [CandidateProfile], parsed: &ParsedQuery, now: DateTime<Utc>) {
    for profile in profiles.iter_mut() {
        profile.scores = Some(score_profile(profile, parsed, now));
    }
    // Vec::sort_by is stable: ties keep discovery order.
    profiles.sort_by(|a, b| b.overall_score().cmp(&a.overall_score()));
    debug!(count = profiles.len(), "profiles ranked");
}

/// Fraction of requested skills the candidate has, as 0-100. A query
/// that asked for no particular skill scores everyone a neutral 50.
fn skill_match_score(profile: &CandidateProfile, parsed: &ParsedQuery) -> u8 {
    let requested = parsed.all_skills();
    if requested.is_empty() {
        return 50;
    }
    let matched = requested
        .iter()
        .filter(|skill| profile.has_skill(skill))
        .count();
    ((matched as f64 / requested.len() as f64) * 100.0).round() as u8
}

/// Years of experience, ten points a year, capped at 100.
fn experience_score(profile: &CandidateProfile) -> u8 {
    let years = profile
        .records
        .values()
        .filter_map(|r| r.years_experience)
        .fold(0.0_f32, f32::max);
    ((years * 10.0).round() as u32).min(100) as u8
}

/// Platform reputation, each signal separately capped and scaled, best
/// signal wins: followers (cap 1000), reputation points (cap 20000),
/// connections (cap 500).
fn reputation_score(profile: &CandidateProfile) -> u8 {
    let mut best = 0u32;
    for record in profile.records.values() {
        if let Some(followers) = record.followers {
            best = best.max(followers.min(1000) / 10);
        }
        if let Some(points) = record.reputation {
            best = best.max(points.min(20_000) / 200);
        }
        if let Some(connections) = record.connections {
            best = best.max(connections.min(500) / 5);
        }
    }
    best.min(100) as u8
}

/// 100 minus days since last activity, floored at zero. Unknown activity
/// scores zero.
fn freshness_score(profile: &CandidateProfile, now: DateTime<Utc>) -> u8 {
    match profile.last_active() {
        Some(at) => {
            let days = now.signed_duration_since(at).num_days().max(0);
            (100 - days.min(100)) as u8
        }
        None => 0,
    }
}

/// Stars plus forks across all records, capped at 2000 and scaled.
fn social_proof_score(profile: &CandidateProfile) -> u8 {
    let total: u32 = profile
        .records
        .values()
        .map(|r| r.stars.unwrap_or(0) + r.forks.unwrap_or(0))
        .sum();
    (total.min(2000) / 20) as u8
}
