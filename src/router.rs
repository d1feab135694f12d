//! Fan-out retrieval across every registered source adapter.
//!
//! The router polls all adapters concurrently and waits for each one for
//! at most `retrieval.fanout_timeout_secs`. A slow adapter is cut off and
//! contributes its fallback document, exactly as if its own request had
//! failed, so one hung service cannot stall the others or shrink the
//! result.
//!
//! ```text
//!             ┌────────────┐
//!   query ──▶ │   Router   │──┬──▶ openalex  ──┐
//!             └────────────┘  ├──▶ wikipedia ──┤  join (registration order)
//!                             ├──▶ gdelt     ──┤──▶ Vec<Document>
//!                             └──▶ govuk     ──┘
//! ```
//!
//! Output order is adapter registration order, then each adapter's own
//! order. No deduplication happens here.

use futures::future::join_all;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::{
    GdeltAdapter, GovUkAdapter, OpenAlexAdapter, Retrieval, SourceAdapter, WikipediaAdapter,
};
use crate::config::Config;
use crate::error::SourceError;
use crate::models::{Document, SourceTag};

/// One adapter's contribution to a fan-out.
#[derive(Debug, Clone)]
pub struct AdapterReport {
    pub adapter: String,
    pub source: SourceTag,
    pub retrieval: Retrieval,
}

pub struct RetrievalRouter {
    adapters: Vec<Box<dyn SourceAdapter>>,
    fanout_timeout: Duration,
}

impl RetrievalRouter {
    /// Create a router with no adapters.
    pub fn new(fanout_timeout: Duration) -> Self {
        Self {
            adapters: Vec::new(),
            fanout_timeout,
        }
    }

    /// Create a router with every enabled built-in adapter, in the order
    /// academic, encyclopedia, news, government.
    pub fn from_config(config: &Config) -> Self {
        let mut router = Self::new(Duration::from_secs(config.retrieval.fanout_timeout_secs));
        let adapters = &config.adapters;

        if adapters.openalex.enabled {
            router.register(Box::new(OpenAlexAdapter::new(&adapters.openalex)));
        }
        if adapters.wikipedia.enabled {
            router.register(Box::new(WikipediaAdapter::new(&adapters.wikipedia)));
        }
        if adapters.gdelt.enabled {
            router.register(Box::new(GdeltAdapter::new(&adapters.gdelt)));
        }
        if adapters.govuk.enabled {
            router.register(Box::new(GovUkAdapter::new(&adapters.govuk)));
        }

        router
    }

    pub fn register(&mut self, adapter: Box<dyn SourceAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn adapters(&self) -> &[Box<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Query every adapter with its default limit and report each outcome.
    pub async fn retrieve_detailed(&self, query: &str) -> Vec<AdapterReport> {
        let calls = self.adapters.iter().map(|adapter| async move {
            let limit = adapter.default_limit();
            let retrieval =
                match tokio::time::timeout(self.fanout_timeout, adapter.retrieve(query, limit))
                    .await
                {
                    Ok(r) => r,
                    Err(_) => {
                        warn!(
                            adapter = adapter.name(),
                            timeout_secs = self.fanout_timeout.as_secs_f32(),
                            "adapter timed out, using fallback"
                        );
                        Retrieval::degraded(
                            adapter.fallback(query),
                            SourceError::Unavailable(format!(
                                "timed out after {:?}",
                                self.fanout_timeout
                            )),
                        )
                    }
                };
            AdapterReport {
                adapter: adapter.name().to_string(),
                source: adapter.source(),
                retrieval,
            }
        });

        let reports = join_all(calls).await;
        for r in &reports {
            info!(
                adapter = %r.adapter,
                documents = r.retrieval.documents.len(),
                degraded = r.retrieval.outcome.is_degraded(),
                "retrieved"
            );
        }
        reports
    }

    /// Concatenated documents from every adapter.
    pub async fn retrieve(&self, query: &str) -> Vec<Document> {
        self.retrieve_detailed(query)
            .await
            .into_iter()
            .flat_map(|r| r.retrieval.documents)
            .collect()
    }
}
