//! Stack Overflow source plugin.
//!
//! Discovery goes through the top-answerers-per-tag endpoint: the
//! query's strongest skill terms map to tags, and the people who answer
//! those tags well are exactly the candidates worth surfacing. Falls
//! back to a name search when no skill was extracted.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::sources::util::{self, SecretString};
use crate::traits::source::{SearchContext, SourceMetadata, SourcePlugin, SourceResponse};
use crate::types::candidate::CandidateRecord;

const STACK_API: &str = "https://api.stackexchange.com/2.3";
const SITE: &str = "stackoverflow";

/// How many skill terms become tag lookups.
const MAX_TAGS: usize = 2;

pub struct StackOverflowPlugin {
    client: reqwest::Client,
    api_key: Option<SecretString>,
}

impl Default for StackOverflowPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl StackOverflowPlugin {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: None,
        }
    }

    /// Attach an API key for the larger request quota.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key));
        self
    }

    fn keyed(&self, mut params: Vec<(String, String)>) -> Vec<(String, String)> {
        params.push(("site".into(), SITE.into()));
        if let Some(key) = &self.api_key {
            params.push(("key".into(), key.expose().to_string()));
        }
        params
    }

    /// Tags worth querying for this search.
    fn tags_for(ctx: &SearchContext) -> Vec<String> {
        ctx.parsed
            .skills
            .iter()
            .take(MAX_TAGS)
            .map(|s| s.replace(' ', "-"))
            .collect()
    }

    async fn top_answerers(&self, tag: &str, limit: usize) -> SourceResult<Vec<TagScore>> {
        let params = self.keyed(vec![("pagesize".into(), limit.to_string())]);
        let response = self
            .client
            .get(format!("{STACK_API}/tags/{tag}/top-answerers/all_time"))
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status));
        }
        let wrapper: ItemsResponse<TagScore> = response.json().await?;
        Ok(wrapper.items)
    }

    async fn users_by_name(&self, name: &str, limit: usize) -> SourceResult<Vec<ShallowUser>> {
        let params = self.keyed(vec![
            ("inname".into(), name.to_string()),
            ("pagesize".into(), limit.to_string()),
            ("order".into(), "desc".into()),
            ("sort".into(), "reputation".into()),
        ]);
        let response = self
            .client
            .get(format!("{STACK_API}/users"))
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status));
        }
        let wrapper: ItemsResponse<ShallowUser> = response.json().await?;
        Ok(wrapper.items)
    }

    async fn run_search(&self, ctx: &SearchContext) -> SourceResult<SourceResponse> {
        let tags = Self::tags_for(ctx);
        let mut candidates: Vec<CandidateRecord> = Vec::new();

        if tags.is_empty() {
            debug!("no skill tags extracted, falling back to name search");
            let users = self
                .users_by_name(&util::sanitize(&ctx.query), ctx.limit)
                .await?;
            candidates.extend(users.into_iter().map(|u| record_from_user(u, None)));
        } else {
            for tag in &tags {
                debug!(tag, "fetching top answerers");
                let scores = self.top_answerers(tag, ctx.limit).await?;
                for score in scores {
                    // The same strong answerer often tops several tags.
                    if candidates
                        .iter()
                        .any(|c| c.id == util::candidate_id("stackoverflow", &score.user.user_id.to_string()))
                    {
                        continue;
                    }
                    candidates.push(record_from_user(score.user, Some(tag.clone())));
                }
            }
        }

        candidates.truncate(ctx.limit);
        let fetched = candidates.len();
        Ok(SourceResponse::new(candidates).with_metadata(SourceMetadata::new(fetched)))
    }
}

#[async_trait]
impl SourcePlugin for StackOverflowPlugin {
    fn name(&self) -> &str {
        "stackoverflow"
    }

    fn priority(&self) -> u8 {
        60
    }

    async fn is_available(&self) -> bool {
        let params = self.keyed(vec![]);
        self.client
            .get(format!("{STACK_API}/info"))
            .query(&params)
            .timeout(Duration::from_millis(400))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn search(
        &self,
        ctx: &SearchContext,
        cancel: CancellationToken,
    ) -> SourceResult<SourceResponse> {
        tokio::select! {
            result = self.run_search(ctx) => result,
            _ = cancel.cancelled() => Err(SourceError::Other("search cancelled".into())),
        }
    }
}

fn api_error(status: reqwest::StatusCode) -> SourceError {
    let message = format!("Stack Exchange API error: {status}");
    match status.as_u16() {
        400 | 401 | 403 => SourceError::Authentication(message),
        429 => SourceError::RateLimit(message),
        _ => SourceError::Other(message),
    }
}

fn record_from_user(user: ShallowUser, tag: Option<String>) -> CandidateRecord {
    let confidence = initial_confidence(&user);
    let mut record = CandidateRecord::new(
        "stackoverflow",
        util::candidate_id("stackoverflow", &user.user_id.to_string()),
    )
    .with_username(util::sanitize(&user.display_name))
    .with_reputation(user.reputation)
    .with_initial_confidence(confidence);

    if let Some(link) = &user.link {
        record = record.with_profile_url(link.clone());
    }
    if let Some(location) = user.location.as_deref().map(util::sanitize) {
        if !location.is_empty() {
            record = record.with_location(location);
        }
    }
    if let Some(epoch) = user.last_access_date {
        if let Some(at) = Utc.timestamp_opt(epoch, 0).single() {
            record = record.with_last_active(at);
        }
    }
    if let Some(tag) = tag {
        record = record.with_skills([tag]);
    }
    record
}

/// Reputation-driven completeness estimate.
fn initial_confidence(user: &ShallowUser) -> u8 {
    let mut confidence: u32 = 30;
    if user.reputation >= 10_000 {
        confidence += 40;
    } else if user.reputation >= 1_000 {
        confidence += 25;
    } else if user.reputation >= 100 {
        confidence += 10;
    }
    if user.location.is_some() {
        confidence += 10;
    }
    if let Some(epoch) = user.last_access_date {
        let active_recently = Utc
            .timestamp_opt(epoch, 0)
            .single()
            .map(|at| Utc::now().signed_duration_since(at).num_days() <= 30)
            .unwrap_or(false);
        if active_recently {
            confidence += 15;
        }
    }
    confidence.min(95) as u8
}

#[derive(Debug, Deserialize)]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TagScore {
    user: ShallowUser,
}

#[derive(Debug, Deserialize)]
struct ShallowUser {
    user_id: u64,
    display_name: String,
    #[serde(default)]
    reputation: u32,
    link: Option<String>,
    location: Option<String>,
    last_access_date: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::enhance_query;

    fn ctx(query: &str) -> SearchContext {
        SearchContext {
            query: query.to_string(),
            location: None,
            parsed: enhance_query(query, None),
            limit: 10,
        }
    }

    fn sample_user(reputation: u32) -> ShallowUser {
        ShallowUser {
            user_id: 7,
            display_name: "Alice".into(),
            reputation,
            link: Some("https://stackoverflow.com/users/7/alice".into()),
            location: Some("Berlin".into()),
            last_access_date: Some(Utc::now().timestamp()),
        }
    }

    #[test]
    fn test_tags_from_skills() {
        let tags = StackOverflowPlugin::tags_for(&ctx("machine learning and rust developer"));
        assert_eq!(tags, vec!["rust", "machine-learning"]);
    }

    #[test]
    fn test_no_skills_means_no_tags() {
        assert!(StackOverflowPlugin::tags_for(&ctx("somebody nice")).is_empty());
    }

    #[test]
    fn test_record_mapping() {
        let record = record_from_user(sample_user(12_000), Some("rust".into()));
        assert_eq!(record.platform, "stackoverflow");
        assert_eq!(record.id, "stackoverflow_7");
        assert_eq!(record.reputation, Some(12_000));
        assert_eq!(record.skills, vec!["rust"]);
        assert!(record.last_active.is_some());
    }

    #[test]
    fn test_high_reputation_scores_high() {
        assert_eq!(initial_confidence(&sample_user(50_000)), 95);
    }

    #[test]
    fn test_low_reputation_scores_low() {
        let user = ShallowUser {
            location: None,
            last_access_date: None,
            ..sample_user(50)
        };
        assert_eq!(initial_confidence(&user), 30);
    }
}
