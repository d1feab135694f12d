//! In-memory [`VectorBackend`].
//!
//! Collections are `Vec`s behind their own `std::sync::Mutex`, so writers
//! to different collections never contend. Search is brute-force cosine
//! distance over the collection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::{Neighbor, StoreEntry, VectorBackend};
use crate::embedding::cosine_distance;

type Collection = Arc<Mutex<Vec<StoreEntry>>>;

pub struct InMemoryBackend {
    dims: usize,
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryBackend {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            bail!("in-memory backend requires dims > 0");
        }
        Ok(Self {
            dims,
            collections: RwLock::new(HashMap::new()),
        })
    }

    fn collection(&self, name: &str) -> Result<Collection> {
        if let Some(c) = self
            .collections
            .read()
            .map_err(|_| anyhow!("collection map lock poisoned"))?
            .get(name)
        {
            return Ok(c.clone());
        }
        let mut map = self
            .collections
            .write()
            .map_err(|_| anyhow!("collection map lock poisoned"))?;
        Ok(map.entry(name.to_string()).or_default().clone())
    }

    fn existing(&self, name: &str) -> Result<Option<Collection>> {
        Ok(self
            .collections
            .read()
            .map_err(|_| anyhow!("collection map lock poisoned"))?
            .get(name)
            .cloned())
    }
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    async fn insert(&self, collection: &str, entries: Vec<StoreEntry>) -> Result<usize> {
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != self.dims) {
            bail!(
                "entry {} has {} dims, collection expects {}",
                bad.id,
                bad.vector.len(),
                self.dims
            );
        }

        let handle = self.collection(collection)?;
        let mut stored = handle
            .lock()
            .map_err(|_| anyhow!("collection '{}' lock poisoned", collection))?;

        let mut written = 0;
        for entry in entries {
            if stored.iter().any(|e| e.id == entry.id) {
                continue;
            }
            stored.push(entry);
            written += 1;
        }
        Ok(written)
    }

    async fn nearest(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<Neighbor>> {
        let handle = match self.existing(collection)? {
            Some(h) => h,
            None => return Ok(Vec::new()),
        };
        let stored = handle
            .lock()
            .map_err(|_| anyhow!("collection '{}' lock poisoned", collection))?;

        let mut neighbors: Vec<Neighbor> = stored
            .iter()
            .map(|e| Neighbor {
                document: e.document.clone(),
                distance: cosine_distance(query, &e.vector),
            })
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(top_k);
        Ok(neighbors)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections
            .write()
            .map_err(|_| anyhow!("collection map lock poisoned"))?
            .remove(collection);
        Ok(())
    }
}

impl InMemoryBackend {
    /// Number of live collections.
    pub fn collection_count(&self) -> usize {
        self.collections.read().map(|m| m.len()).unwrap_or(0)
    }
}
