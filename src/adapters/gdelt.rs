//! GDELT news index adapter.
//!
//! Uses the GDELT DOC 2.0 `artlist` mode. GDELT exposes headlines but no
//! article bodies, so the headline doubles as the document text.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

use super::{build_client, get_json, SourceAdapter};
use crate::config::AdapterConfig;
use crate::error::SourceError;
use crate::models::{Document, SourceTag};

pub const DEFAULT_BASE_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 250;

pub struct GdeltAdapter {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl GdeltAdapter {
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
struct ArticleList {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    seendate: Option<String>,
}

#[async_trait]
impl SourceAdapter for GdeltAdapter {
    fn name(&self) -> &str {
        "gdelt"
    }

    fn description(&self) -> &str {
        "News headlines from the GDELT Project"
    }

    fn source(&self) -> SourceTag {
        SourceTag::NewsIndex
    }

    fn default_limit(&self) -> usize {
        self.limit
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Document>, SourceError> {
        let limit = limit.min(MAX_LIMIT);
        let max_records = limit.to_string();
        let request = self.client.get(&self.base_url).query(&[
            ("query", query),
            ("mode", "artlist"),
            ("maxrecords", max_records.as_str()),
            ("format", "json"),
            ("sort", "hybridrel"),
        ]);
        let list: ArticleList = get_json(request).await?;

        let docs = list
            .articles
            .into_iter()
            .take(limit)
            .filter(|a| !a.title.trim().is_empty())
            .map(|a| {
                let published = a
                    .seendate
                    .unwrap_or_else(|| Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
                Document::new(
                    a.title.clone(),
                    a.title,
                    a.url,
                    SourceTag::NewsIndex,
                    Some(published),
                )
            })
            .collect();

        Ok(docs)
    }

    fn fallback(&self, query: &str) -> Document {
        Document::new(
            format!(
                "Recent news coverage of {} includes various perspectives from different stakeholders and ongoing developments in the field.",
                query
            ),
            format!("News: {}", query),
            "https://gdeltproject.org",
            SourceTag::NewsIndex,
            Some(Utc::now().to_rfc3339()),
        )
    }
}
