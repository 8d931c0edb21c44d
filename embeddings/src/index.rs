//! Vector index: persisted chunk embeddings with typed metadata.
//!
//! The index owns its entries exclusively. Callers upsert whole batches,
//! delete through a typed metadata filter, and query nearest neighbors by
//! cosine distance. [`MemoryIndex`] is the bundled backend: a guarded
//! in-memory map with optional JSON snapshots on disk.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::cosine_distance;

/// Typed metadata carried by every index entry.
///
/// Serialized only at the index boundary; everything above works with the
/// record directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Vault-relative path of the owning note.
    pub path: String,

    /// Zero-based chunk sequence index within the note.
    pub seq: usize,

    /// Nearest enclosing heading (may be empty).
    pub heading: String,

    /// Tags inherited from the note.
    pub tags: Vec<String>,

    /// Note fingerprint at chunk-creation time.
    pub fingerprint: String,
}

/// The persisted unit: chunk text plus its embedding and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique identifier, `{path}:chunk:{seq}` by convention.
    pub id: String,

    /// The embedding vector.
    pub embedding: Embedding,

    /// The chunk text.
    pub text: String,

    /// Typed metadata.
    pub metadata: EntryMetadata,
}

/// A ranked entry returned by a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    /// Identifier of the matched entry.
    pub id: String,

    /// Cosine distance to the query vector, in [0, 2], smaller is closer.
    pub distance: f32,

    /// The chunk text.
    pub text: String,

    /// Typed metadata.
    pub metadata: EntryMetadata,
}

/// Typed predicate over entry metadata.
///
/// All unset fields match; the default filter matches every entry.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Match entries whose path equals this value exactly.
    pub path: Option<String>,

    /// Match entries whose path contains this substring.
    pub path_contains: Option<String>,

    /// Match entries whose tag set intersects these tags.
    pub tags_any: Option<Vec<String>>,
}

impl EntryFilter {
    /// Filter matching all entries of a single note.
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Restrict to paths containing a substring.
    pub fn with_path_contains(mut self, fragment: impl Into<String>) -> Self {
        self.path_contains = Some(fragment.into());
        self
    }

    /// Restrict to entries tagged with any of the given tags.
    pub fn with_tags_any(mut self, tags: Vec<String>) -> Self {
        self.tags_any = Some(tags);
        self
    }

    /// Check whether an entry's metadata satisfies the filter.
    pub fn matches(&self, metadata: &EntryMetadata) -> bool {
        if let Some(path) = &self.path {
            if metadata.path != *path {
                return false;
            }
        }
        if let Some(fragment) = &self.path_contains {
            if !metadata.path.contains(fragment) {
                return false;
            }
        }
        if let Some(tags) = &self.tags_any {
            if !tags.iter().any(|tag| metadata.tags.contains(tag)) {
                return false;
            }
        }
        true
    }
}

/// Trait for vector index backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a batch of entries, keyed by their ids.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Delete every entry matching the filter, returning how many were removed.
    ///
    /// Deleting with a filter that matches nothing succeeds with 0.
    async fn delete_where(&self, filter: &EntryFilter) -> Result<usize>;

    /// Return up to `k` entries nearest to `vector`, ascending by cosine
    /// distance (normalized to [0, 2]). A filter restricts the candidate
    /// set before ranking.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&EntryFilter>,
    ) -> Result<Vec<ScoredEntry>>;

    /// Look up a single entry by id.
    async fn get(&self, id: &str) -> Result<Option<IndexEntry>>;

    /// Total number of entries.
    async fn count(&self) -> Result<usize>;
}

/// In-memory vector index with optional JSON snapshots.
pub struct MemoryIndex {
    /// Stored entries by id.
    entries: RwLock<HashMap<String, IndexEntry>>,

    /// Expected dimension of embeddings.
    dimension: usize,
}

impl MemoryIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dimension,
        }
    }

    /// The dimension this index accepts.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Remove all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        info!("Cleared vector index");
    }

    /// Write a snapshot of all entries to `path`.
    ///
    /// The snapshot is written to a sibling `.tmp` file and renamed into
    /// place so a crash never leaves a truncated snapshot behind.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let entries = self.entries.read().await;
        let snapshot: Vec<&IndexEntry> = entries.values().collect();
        let content = serde_json::to_string(&snapshot)?;
        drop(entries);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;

        debug!("Saved index snapshot to {}", path.display());
        Ok(())
    }

    /// Load a snapshot written by [`MemoryIndex::save`].
    pub async fn load(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).await?;
        let snapshot: Vec<IndexEntry> = serde_json::from_str(&content)?;

        let mut entries = HashMap::with_capacity(snapshot.len());
        for entry in snapshot {
            if entry.embedding.len() != dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: entry.embedding.len(),
                });
            }
            entries.insert(entry.id.clone(), entry);
        }

        info!("Loaded {} entries from index snapshot", entries.len());
        Ok(Self {
            entries: RwLock::new(entries),
            dimension,
        })
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, batch: Vec<IndexEntry>) -> Result<()> {
        for entry in &batch {
            if entry.embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: entry.embedding.len(),
                });
            }
        }

        let mut entries = self.entries.write().await;
        let count = batch.len();
        for entry in batch {
            entries.insert(entry.id.clone(), entry);
        }
        debug!("Upserted {count} index entries");
        Ok(())
    }

    async fn delete_where(&self, filter: &EntryFilter) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !filter.matches(&entry.metadata));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Deleted {removed} index entries");
        }
        Ok(removed)
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&EntryFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<(OrderedFloat<f32>, &IndexEntry)> =
            Vec::with_capacity(entries.len());
        for entry in entries.values() {
            if let Some(filter) = filter {
                if !filter.matches(&entry.metadata) {
                    continue;
                }
            }
            let distance = cosine_distance(vector, &entry.embedding)?;
            scored.push((OrderedFloat(distance), entry));
        }

        // Ascending distance; ties broken by id so results are stable.
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, entry)| ScoredEntry {
                id: entry.id.clone(),
                distance: distance.0,
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<IndexEntry>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}
