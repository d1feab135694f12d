//! Embedding provider abstraction and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait used by the
//! [`ContextStore`](crate::store::ContextStore) and one implementation:
//! - **[`HashEmbedder`]**: expands a SHA-256 content digest into a
//!   fixed-length vector.
//!
//! The hash embedder is a placeholder. It gives identical vectors to
//! identical texts and otherwise unrelated directions; it carries no
//! semantic similarity. Swap in a real model by implementing
//! [`EmbeddingProvider`] and passing it to
//! [`ContextStore::new`](crate::store::ContextStore::new).
//!
//! # Vector Layout
//!
//! ```text
//! sha256(text) = b0 b1 … b31
//! vector       = [b0/255, b1/255, …, b31/255, 0.0, 0.0, …]   (len = dims)
//! ```

use sha2::{Digest, Sha256};

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"sha256-hash"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a single text.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Content-hash embedder. See the module docs for the layout.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "sha256-hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut vector: Vec<f32> = digest
            .iter()
            .take(self.dims)
            .map(|&b| b as f32 / 255.0)
            .collect();
        vector.resize(self.dims, 0.0);
        vector
    }
}

/// Hex SHA-256 of `text`, truncated to 16 characters. Used in store entry keys.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..8])
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance, `1 - cosine_similarity`, in `[0.0, 2.0]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
