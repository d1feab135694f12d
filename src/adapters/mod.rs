//! Source adapters: one per external document service.
//!
//! Every adapter implements [`SourceAdapter`]. The required
//! [`fetch`](SourceAdapter::fetch) step talks to the network and may fail
//! with a [`SourceError`]; the provided [`retrieve`](SourceAdapter::retrieve)
//! method never fails. It converts any error (or an empty result) into a
//! single synthetic document from [`fallback`](SourceAdapter::fallback) and
//! reports the reason in the returned [`Retrieval`].
//!
//! | Adapter | Source tag | Default limit | Max |
//! |---------|-----------|---------------|-----|
//! | [`OpenAlexAdapter`] | `academic-index` | 5 | 25 |
//! | [`WikipediaAdapter`] | `encyclopedia` | 3 | 10 |
//! | [`GdeltAdapter`] | `news-index` | 5 | 250 |
//! | [`GovUkAdapter`] | `government-index` | 3 | 50 |

pub mod gdelt;
pub mod govuk;
pub mod openalex;
pub mod wikipedia;

pub use gdelt::GdeltAdapter;
pub use govuk::GovUkAdapter;
pub use openalex::OpenAlexAdapter;
pub use wikipedia::WikipediaAdapter;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::models::{Document, SourceTag};

const USER_AGENT: &str = concat!("stimulus-harness/", env!("CARGO_PKG_VERSION"));

/// Whether an adapter call produced real content or fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Fetched,
    Degraded(SourceError),
}

impl RetrievalOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalOutcome::Degraded(_))
    }
}

/// Documents returned by one adapter call, tagged with how they were obtained.
///
/// `documents` is never empty.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub documents: Vec<Document>,
    pub outcome: RetrievalOutcome,
}

impl Retrieval {
    pub fn fetched(documents: Vec<Document>) -> Self {
        Self {
            documents,
            outcome: RetrievalOutcome::Fetched,
        }
    }

    pub fn degraded(fallback: Document, reason: SourceError) -> Self {
        Self {
            documents: vec![fallback],
            outcome: RetrievalOutcome::Degraded(reason),
        }
    }
}

/// A component wrapping one external document source.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use stimulus_harness::adapters::SourceAdapter;
/// use stimulus_harness::error::SourceError;
/// use stimulus_harness::models::{Document, SourceTag};
///
/// struct Offline;
///
/// #[async_trait]
/// impl SourceAdapter for Offline {
///     fn name(&self) -> &str { "offline" }
///     fn source(&self) -> SourceTag { SourceTag::NewsIndex }
///     fn default_limit(&self) -> usize { 1 }
///
///     async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<Document>, SourceError> {
///         Err(SourceError::Unavailable("offline".into()))
///     }
///
///     fn fallback(&self, query: &str) -> Document {
///         Document::new(format!("Nothing on {query}"), "offline", "", self.source(), None)
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short instance name (e.g. `"openalex"`), used in logs and listings.
    fn name(&self) -> &str;

    /// Tag stamped on every document this adapter produces, fallbacks included.
    fn source(&self) -> SourceTag;

    /// One-line description for `stim sources`.
    fn description(&self) -> &str {
        ""
    }

    /// Limit used when the caller does not pass one (the router never does).
    fn default_limit(&self) -> usize;

    /// Query the backing service. May fail; must not panic.
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Document>, SourceError>;

    /// Synthetic document substituted when [`fetch`](Self::fetch) cannot
    /// produce real content. Must carry non-empty text and this adapter's tag.
    fn fallback(&self, query: &str) -> Document;

    /// Fetch documents, substituting [`fallback`](Self::fallback) on any fault.
    async fn retrieve(&self, query: &str, limit: usize) -> Retrieval {
        match self.fetch(query, limit.max(1)).await {
            Ok(docs) => {
                let docs: Vec<Document> = docs.into_iter().filter(|d| !d.is_blank()).collect();
                if docs.is_empty() {
                    debug!(adapter = self.name(), query, "no documents, using fallback");
                    Retrieval::degraded(self.fallback(query), SourceError::Empty)
                } else {
                    Retrieval::fetched(docs)
                }
            }
            Err(e) => {
                warn!(adapter = self.name(), query, error = %e, "retrieval failed, using fallback");
                Retrieval::degraded(self.fallback(query), e)
            }
        }
    }
}

/// Build the HTTP client shared by an adapter's requests.
pub(crate) fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Send a request and decode a JSON body.
///
/// - 403 → [`SourceError::Blocked`]
/// - other non-2xx → [`SourceError::Unavailable`]
/// - undecodable body → [`SourceError::Malformed`]
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let response = request.send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(SourceError::Blocked);
    }
    if !status.is_success() {
        return Err(SourceError::Unavailable(format!("HTTP {}", status)));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| SourceError::Malformed(e.to_string()))
}
