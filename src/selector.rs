//! Context selection: the fallback ladder between retrieval and prompting.
//!
//! For a topic, the selector:
//!
//! 1. sends the first `retrieval.query_variants` expansions of the topic
//!    to the [`RetrievalRouter`];
//! 2. removes documents whose URL was already seen (first wins; empty URLs
//!    are never treated as duplicates);
//! 3. picks candidates from the first tier that yields anything:
//!
//! | Tier | Candidates |
//! |------|-----------|
//! | [`ContextTier::VectorSearch`] | top `final_limit` store hits among this request's documents (store operational) |
//! | [`ContextTier::RawDocuments`] | first `final_limit` deduplicated documents, insertion order |
//! | [`ContextTier::Placeholder`] | one synthetic `educational-content` document about the topic |
//!
//! 4. keeps at most `relevance_limit` candidates whose text contains a
//!    whitespace-delimited topic keyword (case-insensitive substring), or
//!    whose source is prioritized.
//!
//! Documents are indexed into a collection private to the call, which is
//! dropped as soon as it has been queried.

use serde::Serialize;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::config::{Config, RetrievalConfig};
use crate::error::PipelineError;
use crate::models::{ContextItem, ContextTier, Document, SourceTag};
use crate::router::RetrievalRouter;
use crate::store::ContextStore;
use crate::topics::expand_topic;

/// The outcome of [`ContextSelector::select`].
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub topic: String,
    pub tier: ContextTier,
    /// Everything the chosen tier produced.
    pub candidates: Vec<ContextItem>,
    /// Candidates that passed the keyword relevance filter.
    pub relevant: Vec<ContextItem>,
    /// False when every candidate is synthetic.
    pub used_real_world_context: bool,
}

pub struct ContextSelector {
    router: RetrievalRouter,
    store: ContextStore,
    settings: RetrievalConfig,
}

impl ContextSelector {
    pub fn new(router: RetrievalRouter, store: ContextStore, settings: RetrievalConfig) -> Self {
        Self {
            router,
            store,
            settings,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RetrievalRouter::from_config(config),
            ContextStore::open(&config.store),
            config.retrieval.clone(),
        )
    }

    pub fn router(&self) -> &RetrievalRouter {
        &self.router
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub async fn select(&self, topic: &str) -> Result<Selection, PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::EmptyTopic);
        }

        let mut merged = Vec::new();
        for query in expand_topic(topic)
            .into_iter()
            .take(self.settings.query_variants)
        {
            merged.extend(self.router.retrieve(&query).await);
        }
        let docs = dedup_by_url(merged);

        let (tier, candidates) = self.choose_tier(topic, docs).await;
        let relevant = filter_relevant(
            &candidates,
            topic,
            &self.settings.prioritized_sources,
            self.settings.relevance_limit,
        );
        let used_real_world_context = candidates.iter().any(|c| !c.source().is_synthetic());

        info!(
            topic,
            %tier,
            candidates = candidates.len(),
            relevant = relevant.len(),
            real_world = used_real_world_context,
            "context selected"
        );

        Ok(Selection {
            topic: topic.to_string(),
            tier,
            candidates,
            relevant,
            used_real_world_context,
        })
    }

    async fn choose_tier(&self, topic: &str, docs: Vec<Document>) -> (ContextTier, Vec<ContextItem>) {
        let limit = self.settings.final_limit;

        if self.store.is_operational() {
            let collection = request_collection(topic);
            self.store.index_in(&collection, &docs).await;
            let hits = self.store.query_in(&collection, topic, limit).await;
            self.store.drop_collection(&collection).await;
            if !hits.is_empty() {
                return (ContextTier::VectorSearch, hits);
            }
        }

        if !docs.is_empty() {
            let raw = docs.into_iter().take(limit).map(ContextItem::from).collect();
            return (ContextTier::RawDocuments, raw);
        }

        (
            ContextTier::Placeholder,
            vec![ContextItem::from(placeholder_document(topic))],
        )
    }
}

/// A collection that lives for one selection only.
fn request_collection(topic: &str) -> String {
    format!("topic:{}:{}", topic.to_lowercase(), Uuid::new_v4())
}

/// Drop documents whose non-empty URL has already been seen.
pub fn dedup_by_url(docs: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    docs.into_iter()
        .filter(|d| d.url.is_empty() || seen.insert(d.url.clone()))
        .collect()
}

/// Lowercased whitespace-delimited words of `topic`.
pub fn topic_keywords(topic: &str) -> Vec<String> {
    topic
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Keep up to `limit` items that mention a topic keyword or come from a
/// prioritized source, preserving order.
pub fn filter_relevant(
    items: &[ContextItem],
    topic: &str,
    prioritized: &[SourceTag],
    limit: usize,
) -> Vec<ContextItem> {
    let keywords = topic_keywords(topic);
    items
        .iter()
        .filter(|item| {
            if prioritized.contains(&item.source()) {
                return true;
            }
            let text = item.text.to_lowercase();
            keywords.iter().any(|k| text.contains(k.as_str()))
        })
        .take(limit)
        .cloned()
        .collect()
}

/// The last-resort context document.
pub fn placeholder_document(topic: &str) -> Document {
    Document::new(
        format!(
            "This scenario explores the complex considerations around {}, involving multiple stakeholders with different priorities and evidence-based positions that warrant careful critical analysis.",
            topic
        ),
        format!("Critical Thinking Scenario: {}", topic),
        "fallback://scenario",
        SourceTag::EducationalContent,
        Some("2024-01-01".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str, url: &str, source: SourceTag) -> Document {
        Document::new(text, "t", url, source, None)
    }

    #[test]
    fn test_dedup_first_seen_wins() {
        let docs = vec![
            doc("one", "https://a", SourceTag::NewsIndex),
            doc("two", "https://b", SourceTag::NewsIndex),
            doc("three", "https://a", SourceTag::Encyclopedia),
        ];
        let out = dedup_by_url(docs);
        let texts: Vec<&str> = out.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_dedup_keeps_all_empty_urls() {
        let docs = vec![
            doc("one", "", SourceTag::NewsIndex),
            doc("two", "", SourceTag::NewsIndex),
        ];
        assert_eq!(dedup_by_url(docs).len(), 2);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let docs = vec![
            doc("one", "https://a", SourceTag::NewsIndex),
            doc("two", "", SourceTag::NewsIndex),
            doc("three", "https://a", SourceTag::NewsIndex),
            doc("four", "", SourceTag::NewsIndex),
            doc("five", "https://c", SourceTag::NewsIndex),
        ];
        let once = dedup_by_url(docs);
        let twice = dedup_by_url(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_keyword_match() {
        let items: Vec<ContextItem> = vec![
            doc("Cameras and Surveillance in classrooms", "a", SourceTag::NewsIndex).into(),
            doc("Nothing related", "b", SourceTag::Encyclopedia).into(),
        ];
        let kept = filter_relevant(&items, "school surveillance policy", &[], 3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].metadata.url, "a");
    }

    #[test]
    fn test_filter_prioritized_bypass() {
        let items: Vec<ContextItem> = vec![
            doc("elections", "a", SourceTag::NewsIndex).into(),
            doc("elections", "b", SourceTag::GovernmentIndex).into(),
        ];
        let kept = filter_relevant(
            &items,
            "voting technology",
            &[SourceTag::AcademicIndex, SourceTag::GovernmentIndex],
            3,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source(), SourceTag::GovernmentIndex);
    }

    #[test]
    fn test_filter_respects_limit() {
        let items: Vec<ContextItem> = (0..6)
            .map(|i| doc("privacy", &format!("u{}", i), SourceTag::NewsIndex).into())
            .collect();
        assert_eq!(filter_relevant(&items, "privacy", &[], 3).len(), 3);
    }

    #[test]
    fn test_placeholder_references_topic() {
        let d = placeholder_document("gene editing ethics");
        assert!(d.text.contains("gene editing ethics"));
        assert_eq!(d.source, SourceTag::EducationalContent);
    }

    #[test]
    fn test_request_collections_are_unique() {
        let a = request_collection("NHS Data");
        let b = request_collection("nhs data");
        assert!(a.starts_with("topic:nhs data:"));
        assert_ne!(a, b);
    }
}
