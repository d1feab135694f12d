//! OpenAlex academic index adapter.
//!
//! Queries `GET /works` for open-access works sorted by citation count.
//! OpenAlex stores abstracts as an inverted index (`word → [positions]`);
//! [`reconstruct_abstract`] rebuilds the linear text. Works without an
//! abstract fall back to their title as body text.
//!
//! # Configuration
//!
//! ```toml
//! [adapters.openalex]
//! base_url = "https://api.openalex.org/works"
//! timeout_secs = 15
//! limit = 5
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{build_client, get_json, SourceAdapter};
use crate::config::AdapterConfig;
use crate::error::SourceError;
use crate::models::{Document, SourceTag};

pub const DEFAULT_BASE_URL: &str = "https://api.openalex.org/works";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LIMIT: usize = 5;
/// Largest `per_page` this adapter will request.
pub const MAX_LIMIT: usize = 25;

pub struct OpenAlexAdapter {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl OpenAlexAdapter {
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
struct WorksResponse {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[async_trait]
impl SourceAdapter for OpenAlexAdapter {
    fn name(&self) -> &str {
        "openalex"
    }

    fn description(&self) -> &str {
        "Open-access scholarly works from OpenAlex"
    }

    fn source(&self) -> SourceTag {
        SourceTag::AcademicIndex
    }

    fn default_limit(&self) -> usize {
        self.limit
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Document>, SourceError> {
        let limit = limit.min(MAX_LIMIT);
        let per_page = limit.to_string();
        let request = self.client.get(&self.base_url).query(&[
            ("search", query),
            ("per_page", per_page.as_str()),
            ("sort", "cited_by_count:desc"),
            ("filter", "is_oa:true"),
        ]);
        let response: WorksResponse = get_json(request).await?;

        let mut docs = Vec::new();
        for work in response.results {
            let text = match &work.abstract_inverted_index {
                Some(index) if !index.is_empty() => reconstruct_abstract(index),
                _ => work.title.clone().unwrap_or_default(),
            };
            if text.trim().is_empty() {
                continue;
            }

            let url = work
                .doi
                .filter(|d| !d.is_empty())
                .or(work.id)
                .unwrap_or_default();
            docs.push(Document::new(
                text,
                work.title
                    .unwrap_or_else(|| "Untitled Research Paper".to_string()),
                url,
                SourceTag::AcademicIndex,
                work.publication_date,
            ));
            if docs.len() >= limit {
                break;
            }
        }

        Ok(docs)
    }

    fn fallback(&self, query: &str) -> Document {
        Document::new(
            format!(
                "Recent academic research on {} examines multiple perspectives and methodological approaches to understanding this complex topic.",
                query
            ),
            format!("Academic Research: {}", query),
            "https://openalex.org",
            SourceTag::AcademicIndex,
            Some("2024-01-01".to_string()),
        )
    }
}

/// Rebuild linear text from an OpenAlex `abstract_inverted_index`.
///
/// Every `(position, word)` pair is sorted by position and joined with
/// single spaces. Gaps are skipped. When two words claim one position the
/// lexicographically smaller wins. Positions are never used as indices, so
/// an arbitrarily large position costs nothing.
pub fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut placed: Vec<(usize, &str)> = index
        .iter()
        .filter(|(word, _)| !word.is_empty())
        .flat_map(|(word, positions)| positions.iter().map(move |&pos| (pos, word.as_str())))
        .collect();
    placed.sort_unstable();
    placed.dedup_by_key(|(pos, _)| *pos);

    placed
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}
