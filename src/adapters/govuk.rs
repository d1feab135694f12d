//! GOV.UK search adapter.
//!
//! Queries the public site-search API, newest first. Result links are
//! site-relative and are joined onto `https://www.gov.uk`. A result
//! without a link keeps an empty URL.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{build_client, get_json, SourceAdapter};
use crate::config::AdapterConfig;
use crate::error::SourceError;
use crate::models::{Document, SourceTag};

pub const DEFAULT_BASE_URL: &str = "https://www.gov.uk/api/search.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LIMIT: usize = 3;
pub const MAX_LIMIT: usize = 50;

const SITE_ROOT: &str = "https://www.gov.uk";

pub struct GovUkAdapter {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl GovUkAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        Self {
            client: build_client(timeout),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            limit: config.limit.unwrap_or(DEFAULT_LIMIT),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    public_timestamp: Option<String>,
}

#[async_trait]
impl SourceAdapter for GovUkAdapter {
    fn name(&self) -> &str {
        "govuk"
    }

    fn description(&self) -> &str {
        "UK government guidance and policy pages"
    }

    fn source(&self) -> SourceTag {
        SourceTag::GovernmentIndex
    }

    fn default_limit(&self) -> usize {
        self.limit
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Document>, SourceError> {
        let limit = limit.min(MAX_LIMIT);
        let count = limit.to_string();
        let request = self.client.get(&self.base_url).query(&[
            ("q", query),
            ("count", count.as_str()),
            ("order", "-public_timestamp"),
        ]);
        let results: SearchResults = get_json(request).await?;

        let docs = results
            .results
            .into_iter()
            .take(limit)
            .map(|r| {
                let text = r
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .or_else(|| r.title.clone())
                    .unwrap_or_default();
                let url = r
                    .link
                    .filter(|l| !l.is_empty())
                    .map(|l| format!("{}{}", SITE_ROOT, l))
                    .unwrap_or_default();
                Document::new(
                    text,
                    r.title.unwrap_or_else(|| "Untitled".to_string()),
                    url,
                    SourceTag::GovernmentIndex,
                    r.public_timestamp,
                )
            })
            .filter(|d| !d.is_blank())
            .collect();

        Ok(docs)
    }

    fn fallback(&self, query: &str) -> Document {
        Document::new(
            format!(
                "UK government policy on {} involves multiple departments and stakeholders with various regulatory and implementation considerations.",
                query
            ),
            format!("GOV.UK: {}", query),
            "https://gov.uk",
            SourceTag::GovernmentIndex,
            None,
        )
    }
}
