//! Embedding cache to avoid re-embedding identical text.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;

struct CacheEntry {
    embedding: Embedding,
    seq: u64,
}

struct CacheInner {
    entries: HashMap<u64, CacheEntry>,
    next_seq: u64,
}

/// Bounded in-memory cache of embeddings, keyed by provider name and text.
///
/// When full, the entry inserted longest ago is evicted.
pub struct EmbeddingCache {
    inner: RwLock<CacheInner>,
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create a cache holding at most `max_entries` embeddings.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            max_entries: max_entries.max(1),
        }
    }

    fn key(provider: &str, text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        provider.hash(&mut hasher);
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Get a cached embedding.
    pub async fn get(&self, provider: &str, text: &str) -> Option<Embedding> {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(&Self::key(provider, text))
            .map(|entry| entry.embedding.clone())
    }

    /// Store an embedding, evicting the oldest entry at capacity.
    pub async fn put(&self, provider: &str, text: &str, embedding: Embedding) {
        let mut inner = self.inner.write().await;

        if inner.entries.len() >= self.max_entries {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| *key)
            {
                inner.entries.remove(&oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .entries
            .insert(Self::key(provider, text), CacheEntry { embedding, seq });
    }

    /// Number of cached embeddings.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Check whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Drop every cached embedding.
    pub async fn clear(&self) {
        self.inner.write().await.entries.clear();
    }
}

/// Provider wrapper that serves repeated texts from an [`EmbeddingCache`].
///
/// Only cache misses are forwarded to the wrapped provider, in a single
/// batched call; results come back in input order either way. Layering the
/// wrapper changes no contract of the provider trait.
pub struct CachedProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
}

impl CachedProvider {
    /// Wrap a provider with a cache of at most `max_entries` embeddings.
    pub fn new(inner: Arc<dyn EmbeddingProvider>, max_entries: usize) -> Self {
        Self {
            inner,
            cache: EmbeddingCache::new(max_entries),
        }
    }

    /// Access the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

#[async_trait]
impl EmbeddingProvider for CachedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut results: Vec<Option<Embedding>> = Vec::with_capacity(texts.len());
        let mut misses: Vec<String> = Vec::new();
        let mut miss_positions: Vec<usize> = Vec::new();

        for (position, text) in texts.iter().enumerate() {
            match self.cache.get(self.inner.name(), text).await {
                Some(embedding) => results.push(Some(embedding)),
                None => {
                    results.push(None);
                    miss_positions.push(position);
                    misses.push(text.clone());
                }
            }
        }

        if !misses.is_empty() {
            let embedded = self.inner.embed(&misses).await?;
            if embedded.len() != misses.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    misses.len(),
                    embedded.len()
                )));
            }

            for ((position, text), embedding) in
                miss_positions.iter().zip(&misses).zip(embedded)
            {
                self.cache
                    .put(self.inner.name(), text, embedding.clone())
                    .await;
                results[*position] = Some(embedding);
            }
        }

        debug!(
            "Embedded {} texts ({} cache hits)",
            texts.len(),
            texts.len() - misses.len()
        );

        Ok(results.into_iter().flatten().collect())
    }
}
