//! GitHub source plugin.
//!
//! Two calls per search: the user search endpoint for discovery, then a
//! bounded fan-out of per-user detail fetches to pick up email, follower
//! count, and activity signals. Detail failures degrade the record, not
//! the search.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::sources::util::{self, SecretString};
use crate::traits::source::{SearchContext, SourceMetadata, SourcePlugin, SourceResponse};
use crate::types::candidate::CandidateRecord;

const GITHUB_API: &str = "https://api.github.com";

/// How many discovered users get a detail fetch.
const MAX_DETAIL_FETCHES: usize = 10;

pub struct GithubPlugin {
    client: reqwest::Client,
    token: Option<SecretString>,
}

impl Default for GithubPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubPlugin {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("sourcing-engine")
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            token: None,
        }
    }

    /// Authenticate requests for the higher rate limit tier.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token));
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        }
    }

    /// GitHub user-search query string from the parsed query.
    fn build_query(ctx: &SearchContext) -> String {
        let mut parts: Vec<String> = ctx.parsed.skills.iter().take(2).cloned().collect();
        if parts.is_empty() {
            parts.push(util::sanitize(&ctx.query));
        }
        if let Some(location) = ctx.parsed.primary_location() {
            parts.push(format!("location:\"{location}\""));
        }
        parts.push("type:user".to_string());
        parts.join(" ")
    }

    async fn fetch_user(&self, login: &str) -> SourceResult<GithubUser> {
        let response = self
            .authorize(self.client.get(format!("{GITHUB_API}/users/{login}")))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(response.json().await?)
    }

    async fn run_search(&self, ctx: &SearchContext) -> SourceResult<SourceResponse> {
        let query = Self::build_query(ctx);
        debug!(%query, "github user search");

        let per_page = ctx.limit.to_string();
        let response = self
            .authorize(self.client.get(format!("{GITHUB_API}/search/users")))
            .query(&[("q", query.as_str()), ("per_page", per_page.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let search: SearchUsersResponse = response.json().await?;
        let fetched = search.items.len();
        let truncated = search.total_count as usize > fetched;

        let skill_terms = ctx.parsed.all_skills();
        let details = join_all(
            search
                .items
                .iter()
                .take(MAX_DETAIL_FETCHES)
                .map(|item| self.fetch_user(&item.login)),
        )
        .await;

        let mut candidates = Vec::with_capacity(fetched);
        for (item, detail) in search.items.iter().zip(details) {
            match detail {
                Ok(user) => candidates.push(record_from_user(user, &skill_terms)),
                Err(err) => {
                    warn!(login = %item.login, %err, "detail fetch failed, keeping shallow record");
                    candidates.push(shallow_record(item));
                }
            }
        }
        // Users past the detail budget still come back, just shallow.
        for item in search.items.iter().skip(MAX_DETAIL_FETCHES) {
            candidates.push(shallow_record(item));
        }

        let metadata = if truncated {
            SourceMetadata::new(fetched).truncated()
        } else {
            SourceMetadata::new(fetched)
        };
        Ok(SourceResponse::new(candidates).with_metadata(metadata))
    }
}

#[async_trait]
impl SourcePlugin for GithubPlugin {
    fn name(&self) -> &str {
        "github"
    }

    fn priority(&self) -> u8 {
        70
    }

    async fn is_available(&self) -> bool {
        self.authorize(self.client.get(format!("{GITHUB_API}/rate_limit")))
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

fn api_error(status: reqwest::StatusCode, body: &str) -> SourceError {
    let message = format!("GitHub API error: {status} {body}");
    match status.as_u16() {
        401 => SourceError::Authentication(message),
        403 if body.to_lowercase().contains("rate limit") => SourceError::RateLimit(message),
        403 => SourceError::Authentication(message),
        429 => SourceError::RateLimit(message),
        _ => SourceError::Other(message),
    }
}

fn shallow_record(item: &SearchUserItem) -> CandidateRecord {
    CandidateRecord::new("github", util::candidate_id("github", &item.id.to_string()))
        .with_username(item.login.clone())
        .with_profile_url(item.html_url.clone())
        .with_initial_confidence(15)
}

fn record_from_user(user: GithubUser, skill_terms: &[String]) -> CandidateRecord {
    let bio = user.bio.as_deref().map(util::sanitize).unwrap_or_default();
    let skills = util::skills_in_text(&bio, skill_terms);

    let years_experience = user.created_at.map(|created| {
        (Utc::now().signed_duration_since(created).num_days().max(0) as f32 / 365.0).min(40.0)
    });

    let mut record =
        CandidateRecord::new("github", util::candidate_id("github", &user.id.to_string()))
            .with_username(user.login.clone())
            .with_profile_url(user.html_url.clone())
            .with_followers(user.followers)
            .with_skills(skills)
            .with_initial_confidence(initial_confidence(&user, &bio));
    if let Some(name) = user.name.as_deref().map(util::sanitize).filter(|n| !n.is_empty()) {
        record = record.with_name(name);
    }
    if let Some(email) = &user.email {
        record = record.with_email(email.clone());
    }
    if let Some(location) = &user.location {
        record = record.with_location(util::sanitize(location));
    }
    if let Some(updated) = user.updated_at {
        record = record.with_last_active(updated);
    }
    if let Some(years) = years_experience {
        record = record.with_years_experience(years);
    }
    if !bio.is_empty() {
        record = record.with_extra("bio", bio);
    }
    record
}

/// Data-completeness estimate for a fully-fetched user.
fn initial_confidence(user: &GithubUser, bio: &str) -> u8 {
    let mut confidence: u32 = 35;
    if user.email.is_some() {
        confidence += 25;
    }
    if user.followers >= 100 {
        confidence += 20;
    } else if user.followers >= 10 {
        confidence += 10;
    }
    if bio.len() > 40 {
        confidence += 10;
    }
    if user.hireable == Some(true) {
        confidence += 5;
    }
    confidence.min(95) as u8
}

#[derive(Debug, Deserialize)]
struct SearchUsersResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchUserItem>,
}

#[derive(Debug, Deserialize)]
struct SearchUserItem {
    id: u64,
    login: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    html_url: String,
    name: Option<String>,
    email: Option<String>,
    location: Option<String>,
    bio: Option<String>,
    #[serde(default)]
    followers: u32,
    hireable: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
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

    fn sample_user() -> GithubUser {
        GithubUser {
            id: 42,
            login: "alice".into(),
            html_url: "https://github.com/alice".into(),
            name: Some("Alice Smith".into()),
            email: Some("alice@example.com".into()),
            location: Some("Berlin".into()),
            bio: Some("Rust and distributed systems. Building schedulers for fun.".into()),
            followers: 250,
            hireable: Some(true),
            created_at: Some(Utc::now() - chrono::Duration::days(5 * 365)),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_build_query_uses_skills_and_location() {
        let q = GithubPlugin::build_query(&ctx("senior rust developer in berlin"));
        assert!(q.contains("rust"));
        assert!(q.contains("location:\"berlin\""));
        assert!(q.contains("type:user"));
    }

    #[test]
    fn test_build_query_falls_back_to_raw_text() {
        let q = GithubPlugin::build_query(&ctx("interesting people"));
        assert!(q.contains("interesting people"));
    }

    #[test]
    fn test_record_mapping() {
        let record = record_from_user(sample_user(), &["rust".to_string()]);
        assert_eq!(record.platform, "github");
        assert_eq!(record.id, "github_42");
        assert_eq!(record.username.as_deref(), Some("alice"));
        assert_eq!(record.email.as_deref(), Some("alice@example.com"));
        assert_eq!(record.skills, vec!["rust"]);
        assert!(record.years_experience.unwrap() > 4.0);
    }

    #[test]
    fn test_complete_profile_scores_high_confidence() {
        let user = sample_user();
        let bio = user.bio.clone().unwrap();
        assert_eq!(initial_confidence(&user, &bio), 95);
    }

    #[test]
    fn test_sparse_profile_scores_low_confidence() {
        let user = GithubUser {
            email: None,
            bio: None,
            followers: 0,
            hireable: None,
            ..sample_user()
        };
        assert_eq!(initial_confidence(&user, ""), 35);
    }

    #[test]
    fn test_validate_result_rejects_anonymous_records() {
        let plugin = GithubPlugin::new();
        assert!(plugin.validate_result(
            &CandidateRecord::new("github", "github_1").with_username("alice")
        ));
        assert!(!plugin.validate_result(&CandidateRecord::new("github", "github_1")));
    }

    #[test]
    fn test_rate_limit_classified() {
        let err = api_error(
            reqwest::StatusCode::FORBIDDEN,
            "API rate limit exceeded for 1.2.3.4",
        );
        assert!(matches!(err, SourceError::RateLimit(_)));
    }
}
