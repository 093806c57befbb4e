//! LinkedIn source plugin.
//!
//! Two-phase workflow: public profile URLs are discovered through a
//! programmable search engine scoped to `linkedin.com/in`, then the
//! discovered URLs go to a scraping actor for profile details. The
//! detail phase is the expensive, slow, rate-sensitive half, so it is
//! paced by a governor quota and polls the actor run with deliberate
//! delays rather than hammering it.
//!
//! The cancellation token is checked between phases and on every poll;
//! an actor run already started upstream is not torn down, matching the
//! best-effort cancellation contract.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{SourceError, SourceResult};
use crate::sources::util::{self, SecretString};
use crate::traits::source::{SearchContext, SourceMetadata, SourcePlugin, SourceResponse};
use crate::types::candidate::CandidateRecord;

const CSE_API: &str = "https://www.googleapis.com/customsearch/v1";
const ACTOR_API: &str = "https://api.apify.com/v2";

/// Actor that scrapes public LinkedIn profile pages.
const PROFILE_ACTOR: &str = "linkedin-profile-scraper";

type DetailLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct LinkedInPlugin {
    client: reqwest::Client,
    search_key: SecretString,
    engine_id: String,
    actor_token: SecretString,
    limiter: Arc<DetailLimiter>,
    poll_interval: Duration,
    max_polls: u32,
}

impl LinkedInPlugin {
    pub fn new(
        search_key: impl Into<String>,
        engine_id: impl Into<String>,
        actor_token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            search_key: SecretString::new(search_key),
            engine_id: engine_id.into(),
            actor_token: SecretString::new(actor_token),
            // One detail batch per second keeps the actor happy.
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(nonzero!(1u32)))),
            poll_interval: Duration::from_secs(2),
            max_polls: 30,
        }
    }

    /// Override the actor poll cadence.
    pub fn with_poll_interval(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// Phase one: discover public profile URLs.
    async fn discover(&self, ctx: &SearchContext) -> SourceResult<Vec<String>> {
        let query = Self::discovery_query(ctx);
        debug!(%query, "linkedin profile discovery");

        let num = ctx.limit.min(10).to_string();
        let response = self
            .client
            .get(CSE_API)
            .query(&[
                ("key", self.search_key.expose()),
                ("cx", self.engine_id.as_str()),
                ("q", query.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(discovery_error(status));
        }

        let body: DiscoveryResponse = response.json().await?;
        let urls: Vec<String> = body
            .items
            .into_iter()
            .map(|item| item.link)
            .filter(|link| link.contains("linkedin.com/in/"))
            .collect();
        info!(found = urls.len(), "profile urls discovered");
        Ok(urls)
    }

    fn discovery_query(ctx: &SearchContext) -> String {
        let mut parts = vec!["site:linkedin.com/in".to_string()];
        if !ctx.parsed.skills.is_empty() {
            parts.extend(ctx.parsed.skills.iter().take(3).cloned());
        } else {
            parts.push(util::sanitize(&ctx.query));
        }
        if let Some(role) = ctx.parsed.role_types.first() {
            parts.push(role.clone());
        }
        if let Some(location) = ctx.parsed.primary_location() {
            parts.push(format!("\"{location}\""));
        }
        parts.join(" ")
    }

    /// Phase two: run the scraping actor over the discovered URLs and
    /// wait for its dataset.
    async fn scrape_profiles(
        &self,
        urls: &[String],
        cancel: &CancellationToken,
    ) -> SourceResult<Vec<ProfileItem>> {
        self.limiter.until_ready().await;

        let run = self.start_run(urls).await?;
        info!(run_id = %run.id, urls = urls.len(), "scrape run started, polling");

        let completed = self.wait_for_run(&run.id, cancel).await?;
        self.dataset_items(&completed.default_dataset_id).await
    }

    async fn start_run(&self, urls: &[String]) -> SourceResult<RunData> {
        let input = RunInput {
            profile_urls: urls.to_vec(),
        };
        let response = self
            .client
            .post(format!("{ACTOR_API}/acts/{PROFILE_ACTOR}/runs"))
            .bearer_auth(self.actor_token.expose())
            .json(&input)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(actor_error(status));
        }
        let wrapper: ActorResponse<RunData> = response.json().await?;
        Ok(wrapper.data)
    }

    async fn wait_for_run(
        &self,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> SourceResult<RunData> {
        for _ in 0..self.max_polls {
            if cancel.is_cancelled() {
                return Err(SourceError::Other(
                    "search cancelled while scrape run in progress".into(),
                ));
            }

            let response = self
                .client
                .get(format!("{ACTOR_API}/actor-runs/{run_id}"))
                .bearer_auth(self.actor_token.expose())
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(actor_error(status));
            }

            let wrapper: ActorResponse<RunData> = response.json().await?;
            match wrapper.data.status.as_str() {
                "SUCCEEDED" => return Ok(wrapper.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(SourceError::Other(format!(
                        "scrape run ended as {}",
                        wrapper.data.status
                    )));
                }
                other => {
                    debug!(run_id, status = %other, "run still in progress");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {
                    return Err(SourceError::Other(
                        "search cancelled while scrape run in progress".into(),
                    ));
                }
            }
        }
        Err(SourceError::Timeout(format!(
            "scrape run {run_id} did not finish within {} polls",
            self.max_polls
        )))
    }

    async fn dataset_items(&self, dataset_id: &str) -> SourceResult<Vec<ProfileItem>> {
        let response = self
            .client
            .get(format!("{ACTOR_API}/datasets/{dataset_id}/items"))
            .query(&[("format", "json")])
            .bearer_auth(self.actor_token.expose())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(actor_error(status));
        }
        Ok(response.json().await?)
    }

    async fn run_search(
        &self,
        ctx: &SearchContext,
        cancel: &CancellationToken,
    ) -> SourceResult<SourceResponse> {
        let urls = self.discover(ctx).await?;
        if urls.is_empty() {
            return Ok(SourceResponse::new(vec![]));
        }
        if cancel.is_cancelled() {
            return Err(SourceError::Other("search cancelled after discovery".into()));
        }

        let profiles = self.scrape_profiles(&urls, cancel).await?;
        let fetched = profiles.len();

        let skill_terms = ctx.parsed.all_skills();
        let candidates: Vec<CandidateRecord> = profiles
            .into_iter()
            .enumerate()
            .map(|(index, profile)| record_from_profile(index, profile, &skill_terms))
            .collect();

        Ok(SourceResponse::new(candidates).with_metadata(SourceMetadata::new(fetched)))
    }
}

#[async_trait]
impl SourcePlugin for LinkedInPlugin {
    fn name(&self) -> &str {
        "linkedin"
    }

    fn priority(&self) -> u8 {
        80
    }

    async fn is_available(&self) -> bool {
        // Reachability of the actor platform is the gating dependency;
        // discovery shares infrastructure with the google plugin.
        self.client
            .get(format!("{ACTOR_API}/users/me"))
            .bearer_auth(self.actor_token.expose())
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
        self.run_search(ctx, &cancel).await
    }
}

fn discovery_error(status: reqwest::StatusCode) -> SourceError {
    let message = format!("profile discovery error: {status}");
    match status.as_u16() {
        400 | 401 | 403 => SourceError::Authentication(message),
        429 => SourceError::RateLimit(message),
        _ => SourceError::Other(message),
    }
}

fn actor_error(status: reqwest::StatusCode) -> SourceError {
    let message = format!("scrape actor error: {status}");
    match status.as_u16() {
        401 | 403 => SourceError::Authentication(message),
        429 => SourceError::RateLimit(message),
        _ => SourceError::Other(message),
    }
}

fn record_from_profile(
    index: usize,
    profile: ProfileItem,
    skill_terms: &[String],
) -> CandidateRecord {
    let headline = profile
        .headline
        .as_deref()
        .map(util::sanitize)
        .unwrap_or_default();

    let mut skills = profile.skills.clone();
    for skill in util::skills_in_text(&headline, skill_terms) {
        if !skills.iter().any(|s| s.eq_ignore_ascii_case(&skill)) {
            skills.push(skill);
        }
    }

    let username = profile
        .profile_url
        .as_deref()
        .and_then(|u| u.trim_end_matches('/').rsplit('/').next().map(String::from));

    let confidence = initial_confidence(&profile, &headline);
    let mut record = CandidateRecord::new(
        "linkedin",
        util::candidate_id("linkedin", &index.to_string()),
    )
    .with_skills(skills)
    .with_initial_confidence(confidence);

    if let Some(name) = profile.full_name.as_deref().map(util::sanitize).filter(|n| !n.is_empty()) {
        record = record.with_name(name);
    }
    if !headline.is_empty() {
        record = record.with_title(headline);
    }
    if let Some(location) = profile.location.as_deref().map(util::sanitize) {
        if !location.is_empty() {
            record = record.with_location(location);
        }
    }
    if let Some(email) = &profile.email {
        record = record.with_email(email.clone());
    }
    if let Some(url) = &profile.profile_url {
        record = record.with_profile_url(url.clone());
    }
    if let Some(username) = username {
        record = record.with_username(username);
    }
    if let Some(connections) = profile.connections {
        record = record.with_connections(connections);
    }
    if let Some(years) = profile.years_experience {
        record = record.with_years_experience(years);
    }
    record
}

/// Completeness estimate for a scraped profile.
fn initial_confidence(profile: &ProfileItem, headline: &str) -> u8 {
    let mut confidence: u32 = 40;
    if profile.email.is_some() {
        confidence += 20;
    }
    if profile.connections.unwrap_or(0) >= 500 {
        confidence += 15;
    }
    if profile.skills.len() >= 3 {
        confidence += 10;
    }
    if headline.len() > 20 {
        confidence += 10;
    }
    confidence.min(95) as u8
}

#[derive(Debug, Serialize)]
struct RunInput {
    #[serde(rename = "profileUrls")]
    profile_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ActorResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RunData {
    id: String,
    status: String,
    #[serde(rename = "defaultDatasetId", default)]
    default_dataset_id: String,
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(default)]
    items: Vec<DiscoveryItem>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryItem {
    link: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ProfileItem {
    #[serde(rename = "fullName")]
    full_name: Option<String>,
    headline: Option<String>,
    location: Option<String>,
    email: Option<String>,
    #[serde(rename = "profileUrl")]
    profile_url: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
    connections: Option<u32>,
    #[serde(rename = "yearsExperience")]
    years_experience: Option<f32>,
}
