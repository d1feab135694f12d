//! Wikipedia encyclopedia adapter.
//!
//! Two-step retrieval: a MediaWiki full-text search for page titles, then
//! one REST page-summary request per title. Requests are paced with a
//! fixed politeness delay (`search_delay_ms` before the search,
//! `page_delay_ms` before each summary).
//!
//! Wikipedia blocks some clients outright. Any 403, on the search or on a
//! summary, is [`SourceError::Blocked`] and ends the call immediately; no
//! further pages are requested. Other non-success summary statuses skip
//! that page only.
//!
//! When the adapter falls back it picks a canned background paragraph by
//! case-insensitive keyword match against the query (see [`CANNED_TOPICS`]).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{build_client, get_json, SourceAdapter};
use crate::config::AdapterConfig;
use crate::error::SourceError;
use crate::models::{Document, SourceTag};

pub const DEFAULT_SEARCH_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LIMIT: usize = 3;
pub const MAX_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_DELAY_MS: u64 = 1000;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 500;

/// Keyword → background paragraph, checked in order. The last entry is
/// also the default when nothing matches.
pub const CANNED_TOPICS: &[(&str, &str)] = &[
    (
        "surveillance",
        "Surveillance technology involves systematic observation for security, law enforcement, or monitoring purposes. Modern systems include CCTV networks, facial recognition, and digital tracking. Key ethical concerns include privacy rights, data protection, proportionality of monitoring, and potential for misuse or discriminatory targeting.",
    ),
    (
        "privacy",
        "Privacy rights encompass individuals' control over personal information and freedom from unwanted observation. Digital privacy involves data protection, consent mechanisms, and transparency in data collection. Balancing privacy with security, public safety, and technological advancement remains a key policy challenge.",
    ),
    (
        "algorithm",
        "Algorithmic systems use computational methods to process data and make decisions. Applications include recommendation systems, automated hiring, credit scoring, and predictive policing. Key concerns include bias, transparency, accountability, and fairness in automated decision-making processes.",
    ),
    (
        "monitoring",
        "Monitoring systems track behaviour, performance, or compliance across various contexts including workplace, education, and public spaces. Technologies include activity tracking, performance analytics, and behavioural analysis. Ethical considerations include consent, proportionality, and impact on human autonomy.",
    ),
    (
        "technology",
        "Technology implementation in public and private sectors involves adopting new systems for efficiency, security, or service delivery. Considerations include cost-benefit analysis, stakeholder impact, privacy implications, and long-term societal effects of technological change.",
    ),
];

pub struct WikipediaAdapter {
    client: reqwest::Client,
    search_url: String,
    summary_url: String,
    limit: usize,
    search_delay: Duration,
    page_delay: Duration,
}

impl WikipediaAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        Self {
            client: build_client(timeout),
            search_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            summary_url: config
                .summary_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SUMMARY_URL.to_string()),
            limit: config.limit.unwrap_or(DEFAULT_LIMIT),
            search_delay: Duration::from_millis(
                config.search_delay_ms.unwrap_or(DEFAULT_SEARCH_DELAY_MS),
            ),
            page_delay: Duration::from_millis(config.page_delay_ms.unwrap_or(DEFAULT_PAGE_DELAY_MS)),
        }
    }

    fn summary_endpoint(&self, title: &str) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.summary_url)
            .map_err(|e| SourceError::Unavailable(format!("bad summary url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Unavailable("summary url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(title);
        Ok(url)
    }

    async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    #[serde(default)]
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    #[serde(default)]
    page: String,
}

#[async_trait]
impl SourceAdapter for WikipediaAdapter {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Page summaries from English Wikipedia"
    }

    fn source(&self) -> SourceTag {
        SourceTag::Encyclopedia
    }

    fn default_limit(&self) -> usize {
        self.limit
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Document>, SourceError> {
        let limit = limit.min(MAX_LIMIT).to_string();

        Self::pause(self.search_delay).await;
        let request = self.client.get(&self.search_url).query(&[
            ("action", "query"),
            ("format", "json"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
        ]);
        let search: SearchResponse = get_json(request).await?;
        let hits = search.query.map(|q| q.search).unwrap_or_default();

        let mut docs = Vec::new();
        for hit in hits {
            Self::pause(self.page_delay).await;

            let response = match self
                .client
                .get(self.summary_endpoint(&hit.title)?)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(title = %hit.title, error = %e, "page summary request failed");
                    continue;
                }
            };
            let status = response.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                return Err(SourceError::Blocked);
            }
            if !status.is_success() {
                debug!(title = %hit.title, %status, "skipping page summary");
                continue;
            }

            let summary: PageSummary = match response.json().await {
                Ok(s) => s,
                Err(e) => {
                    debug!(title = %hit.title, error = %e, "unreadable page summary");
                    continue;
                }
            };
            let url = summary
                .content_urls
                .and_then(|c| c.desktop)
                .map(|d| d.page)
                .unwrap_or_default();
            docs.push(Document::new(
                summary.extract,
                hit.title,
                url,
                SourceTag::Encyclopedia,
                summary.timestamp,
            ));
        }

        Ok(docs)
    }

    fn fallback(&self, query: &str) -> Document {
        Document::new(
            canned_background(query),
            format!("Background: {}", title_case(query)),
            "https://wikipedia.org",
            SourceTag::Encyclopedia,
            None,
        )
    }
}

/// Pick the canned paragraph whose keyword appears in `query`.
pub fn canned_background(query: &str) -> &'static str {
    let query = query.to_lowercase();
    let default = CANNED_TOPICS[CANNED_TOPICS.len() - 1].1;
    CANNED_TOPICS
        .iter()
        .find(|(keyword, _)| query.contains(keyword))
        .map(|(_, text)| *text)
        .unwrap_or(default)
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_keyword_match_is_case_insensitive() {
        assert!(canned_background("School SURVEILLANCE policy").starts_with("Surveillance"));
        assert!(canned_background("NHS data Privacy").starts_with("Privacy"));
    }

    #[test]
    fn test_canned_first_match_wins() {
        // both "privacy" and "monitoring" appear; "privacy" is listed first
        assert!(canned_background("employee monitoring privacy").starts_with("Privacy"));
    }

    #[test]
    fn test_canned_default() {
        assert!(canned_background("gene editing ethics").starts_with("Technology"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("voting technology"), "Voting Technology");
        assert_eq!(title_case("  NHS  data "), "Nhs Data");
    }

    #[test]
    fn test_summary_endpoint_encodes_title() {
        let adapter = WikipediaAdapter::new(&AdapterConfig::default());
        let url = adapter.summary_endpoint("Mass surveillance").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Mass%20surveillance"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_waits_for_delay() {
        let start = tokio::time::Instant::now();
        WikipediaAdapter::pause(Duration::ZERO).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        WikipediaAdapter::pause(Duration::from_millis(DEFAULT_SEARCH_DELAY_MS)).await;
        assert!(start.elapsed() >= Duration::from_millis(DEFAULT_SEARCH_DELAY_MS));
    }

    #[test]
    fn test_default_delays() {
        let adapter = WikipediaAdapter::new(&AdapterConfig::default());
        assert_eq!(adapter.search_delay, Duration::from_millis(1000));
        assert_eq!(adapter.page_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_fallback_is_tagged() {
        let adapter = WikipediaAdapter::new(&AdapterConfig::default());
        let doc = adapter.fallback("workplace monitoring ethics");
        assert_eq!(doc.source, SourceTag::Encyclopedia);
        assert_eq!(doc.title, "Background: Workplace Monitoring Ethics");
        assert!(doc.text.starts_with("Monitoring"));
    }
}
