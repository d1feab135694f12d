//! Ephemeral similarity-indexed cache of retrieved documents.
//!
//! The [`ContextStore`] embeds documents with an [`EmbeddingProvider`] and
//! keeps them in a pluggable [`VectorBackend`]. Whether the backend could
//! be created is decided exactly once, in the constructor:
//!
//! | State | `index` | `query` |
//! |-------|---------|---------|
//! | [`StoreState::Operational`] | embeds and inserts | nearest neighbors by cosine distance |
//! | [`StoreState::Degraded`] | no-op | empty |
//!
//! There is no reconnect: a degraded store stays degraded for its lifetime.
//!
//! Entries live in named collections. Each collection is written under its
//! own lock. Callers that need request-scoped documents index into a fresh
//! collection and remove it with [`ContextStore::drop_collection`] once
//! they have queried it.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::embedding::{content_hash, EmbeddingProvider, HashEmbedder};
use crate::models::{ContextItem, Document};

pub use memory::InMemoryBackend;

/// Collection used by [`ContextStore::index`] and [`ContextStore::query`].
pub const DEFAULT_COLLECTION: &str = "documents";

/// A stored document and its embedding. Write-once.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// `doc_{batch_index}_{content_hash}`.
    pub id: String,
    pub document: Document,
    pub vector: Vec<f32>,
}

/// A nearest-neighbor match.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub document: Document,
    pub distance: f32,
}

/// Storage behind a [`ContextStore`].
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert entries into `collection`, skipping ids that already exist.
    ///
    /// Returns the number of entries actually written.
    async fn insert(&self, collection: &str, entries: Vec<StoreEntry>) -> Result<usize>;

    /// Up to `top_k` entries closest to `query`, ascending cosine distance.
    async fn nearest(&self, collection: &str, query: &[f32], top_k: usize)
        -> Result<Vec<Neighbor>>;

    /// Remove `collection` and everything in it. Unknown names are a no-op.
    async fn drop_collection(&self, collection: &str) -> Result<()>;
}

/// Operational state, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Operational,
    Degraded,
}

impl StoreState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreState::Operational => "operational",
            StoreState::Degraded => "degraded",
        }
    }
}

pub struct ContextStore {
    backend: Option<Box<dyn VectorBackend>>,
    embedder: Box<dyn EmbeddingProvider>,
}

impl ContextStore {
    /// Wrap the outcome of backend construction.
    ///
    /// An `Err` puts the store into [`StoreState::Degraded`] permanently.
    pub fn new(
        backend: Result<Box<dyn VectorBackend>>,
        embedder: Box<dyn EmbeddingProvider>,
    ) -> Self {
        let backend = match backend {
            Ok(b) => {
                info!(model = embedder.model_name(), dims = embedder.dims(), "context store operational");
                Some(b)
            }
            Err(e) => {
                warn!(error = %e, "context store backend unavailable; vector search disabled");
                None
            }
        };
        Self { backend, embedder }
    }

    /// Build the store described by `config`, with the hash embedder.
    pub fn open(config: &StoreConfig) -> Self {
        Self::new(create_backend(config), Box::new(HashEmbedder::new(config.dims)))
    }

    /// A store that is degraded from the start.
    pub fn degraded() -> Self {
        Self {
            backend: None,
            embedder: Box::new(HashEmbedder::new(0)),
        }
    }

    pub fn state(&self) -> StoreState {
        if self.backend.is_some() {
            StoreState::Operational
        } else {
            StoreState::Degraded
        }
    }

    pub fn is_operational(&self) -> bool {
        self.state() == StoreState::Operational
    }

    pub async fn index(&self, documents: &[Document]) {
        self.index_in(DEFAULT_COLLECTION, documents).await
    }

    /// Embed and store `documents` in `collection`. Blank documents are
    /// skipped. Never fails; backend errors are logged.
    pub async fn index_in(&self, collection: &str, documents: &[Document]) {
        let backend = match &self.backend {
            Some(b) => b,
            None => {
                debug!(collection, "context store degraded, skipping index");
                return;
            }
        };

        let entries: Vec<StoreEntry> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| !doc.is_blank())
            .map(|(i, doc)| StoreEntry {
                id: format!("doc_{}_{}", i, content_hash(&doc.text)),
                document: doc.clone(),
                vector: self.embedder.embed(&doc.text),
            })
            .collect();
        if entries.is_empty() {
            return;
        }

        match backend.insert(collection, entries).await {
            Ok(n) => debug!(collection, indexed = n, "indexed documents"),
            Err(e) => warn!(collection, error = %e, "document indexing failed"),
        }
    }

    pub async fn query(&self, question: &str, top_k: usize) -> Vec<ContextItem> {
        self.query_in(DEFAULT_COLLECTION, question, top_k).await
    }

    /// Nearest entries to `question` in `collection`, ascending distance.
    /// Empty when degraded or on any backend error.
    pub async fn query_in(&self, collection: &str, question: &str, top_k: usize) -> Vec<ContextItem> {
        let backend = match &self.backend {
            Some(b) => b,
            None => return Vec::new(),
        };
        if top_k == 0 {
            return Vec::new();
        }

        let vector = self.embedder.embed(question);
        match backend.nearest(collection, &vector, top_k).await {
            Ok(neighbors) => neighbors
                .into_iter()
                .map(|n| ContextItem {
                    distance: Some(n.distance),
                    ..ContextItem::from(n.document)
                })
                .collect(),
            Err(e) => {
                warn!(collection, error = %e, "context store query failed");
                Vec::new()
            }
        }
    }

    /// Discard `collection`. Never fails; backend errors are logged.
    pub async fn drop_collection(&self, collection: &str) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.drop_collection(collection).await {
                warn!(collection, error = %e, "failed to drop collection");
            }
        }
    }
}

/// Create the backend named by `config.backend`.
pub fn create_backend(config: &StoreConfig) -> Result<Box<dyn VectorBackend>> {
    match config.backend.as_str() {
        "memory" => Ok(Box::new(InMemoryBackend::new(config.dims)?)),
        "disabled" => anyhow::bail!("context store is disabled"),
        other => anyhow::bail!("Unknown store backend: {}", other),
    }
}
