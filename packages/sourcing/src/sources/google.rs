//! Google Programmable Search source plugin.
//!
//! A general-web discovery source: result titles and snippets become
//! shallow candidate records. Everything here is low-confidence by
//! construction; the value of this source is surfacing profile URLs that
//! stronger records can later merge onto.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::sources::util::{self, SecretString};
use crate::traits::source::{SearchContext, SourceMetadata, SourcePlugin, SourceResponse};
use crate::types::candidate::CandidateRecord;

const CSE_API: &str = "https://www.googleapis.com/customsearch/v1";

/// The API caps one page at ten results.
const PAGE_SIZE: usize = 10;

pub struct GoogleSearchPlugin {
    client: reqwest::Client,
    api_key: SecretString,
    engine_id: String,
}

impl GoogleSearchPlugin {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: SecretString::new(api_key),
            engine_id: engine_id.into(),
        }
    }

    fn build_query(ctx: &SearchContext) -> String {
        let mut parts = vec![util::sanitize(&ctx.query)];
        if let Some(location) = ctx.parsed.primary_location() {
            if !ctx.query.to_lowercase().contains(location) {
                parts.push(location.to_string());
            }
        }
        parts.push("developer profile".to_string());
        parts.join(" ")
    }

    async fn run_search(&self, ctx: &SearchContext) -> SourceResult<SourceResponse> {
        let query = Self::build_query(ctx);
        debug!(%query, "google custom search");

        let num = ctx.limit.min(PAGE_SIZE).to_string();
        let response = self
            .client
            .get(CSE_API)
            .query(&[
                ("key", self.api_key.expose()),
                ("cx", self.engine_id.as_str()),
                ("q", query.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status));
        }

        let body: CseResponse = response.json().await?;
        let skill_terms = ctx.parsed.all_skills();
        let candidates: Vec<CandidateRecord> = body
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| record_from_item(index, item, &skill_terms))
            .collect();

        let fetched = candidates.len();
        let truncated = ctx.limit > PAGE_SIZE && fetched == PAGE_SIZE;
        let metadata = if truncated {
            SourceMetadata::new(fetched).truncated()
        } else {
            SourceMetadata::new(fetched)
        };
        Ok(SourceResponse::new(candidates).with_metadata(metadata))
    }
}

#[async_trait]
impl SourcePlugin for GoogleSearchPlugin {
    fn name(&self) -> &str {
        "google"
    }

    fn priority(&self) -> u8 {
        30
    }

    async fn is_available(&self) -> bool {
        // A HEAD against the endpoint answers "is the service reachable"
        // without spending query quota.
        self.client
            .head(CSE_API)
            .timeout(Duration::from_millis(400))
            .send()
            .await
            .is_ok()
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

    /// Web hits are too loose for the default check: a record with only a
    /// URL is still useful here, because deduplication can merge it onto
    /// a stronger record by URL slug.
    fn validate_result(&self, record: &CandidateRecord) -> bool {
        record.profile_url.is_some() || util::has_minimum_fields(record)
    }
}

fn api_error(status: reqwest::StatusCode) -> SourceError {
    let message = format!("Custom Search API error: {status}");
    match status.as_u16() {
        400 | 401 | 403 => SourceError::Authentication(message),
        429 => SourceError::RateLimit(message),
        _ => SourceError::Other(message),
    }
}

fn record_from_item(index: usize, item: &CseItem, skill_terms: &[String]) -> CandidateRecord {
    let snippet = item.snippet.as_deref().map(util::sanitize).unwrap_or_default();
    let name = item
        .title
        .as_deref()
        .map(title_to_name)
        .filter(|n| !n.is_empty());
    let email = util::extract_email(&snippet);

    let mut record = CandidateRecord::new("google", util::candidate_id("google", &index.to_string()))
        .with_profile_url(item.link.clone())
        .with_skills(util::skills_in_text(&snippet, skill_terms))
        .with_initial_confidence(initial_confidence(name.is_some(), email.is_some(), &snippet));
    if let Some(name) = name {
        record = record.with_name(name);
    }
    if let Some(email) = email {
        record = record.with_email(email);
    }
    if !snippet.is_empty() {
        record = record.with_extra("snippet", snippet);
    }
    record
}

/// "Alice Smith - Senior Engineer - Acme | LinkedIn" -> "Alice Smith".
fn title_to_name(title: &str) -> String {
    let head = title
        .split(['-', '|', '–'])
        .next()
        .unwrap_or_default();
    util::sanitize(head)
}

fn initial_confidence(has_name: bool, has_email: bool, snippet: &str) -> u8 {
    let mut confidence: u32 = 15;
    if has_name {
        confidence += 15;
    }
    if has_email {
        confidence += 20;
    }
    if snippet.len() > 80 {
        confidence += 10;
    }
    confidence.min(60) as u8
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    title: Option<String>,
    link: String,
    snippet: Option<String>,
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

    #[test]
    fn test_title_to_name() {
        assert_eq!(
            title_to_name("Alice Smith - Senior Engineer - Acme | LinkedIn"),
            "Alice Smith"
        );
        assert_eq!(title_to_name("GitHub - alice"), "GitHub");
    }

    #[test]
    fn test_build_query_appends_location_once() {
        let q = GoogleSearchPlugin::build_query(&ctx("rust developer in berlin"));
        assert_eq!(q.matches("berlin").count(), 1);
    }

    #[test]
    fn test_record_mapping_extracts_email_and_skills() {
        let item = CseItem {
            title: Some("Alice Smith - Rust Developer".into()),
            link: "https://github.com/alice".into(),
            snippet: Some("Rust and Python contributor. Contact alice@example.com for consulting work.".into()),
        };
        let record = record_from_item(0, &item, &["rust".into(), "python".into()]);

        assert_eq!(record.name.as_deref(), Some("Alice Smith"));
        assert_eq!(record.email.as_deref(), Some("alice@example.com"));
        assert_eq!(record.skills, vec!["rust", "python"]);
        assert!(record.initial_confidence >= 50);
    }

    #[test]
    fn test_url_only_records_pass_validation() {
        let plugin = GoogleSearchPlugin::new("key", "cx");
        let record = CandidateRecord::new("google", "google_0")
            .with_profile_url("https://linkedin.com/in/alice");
        assert!(plugin.validate_result(&record));
    }
}
