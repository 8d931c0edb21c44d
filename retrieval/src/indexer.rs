//! Reindexing pipeline: notes in, index entries out.
//!
//! For every note the indexer compares the stored fingerprint against the
//! source listing, and only changed notes are re-read, re-chunked, and
//! re-embedded. Entries are keyed `{path}:chunk:{seq}`, and a note's old
//! entries are deleted before its new ones are written so no stale chunk
//! survives an edit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use lodestone_embeddings::{
    EmbeddingProvider, EntryFilter, EntryMetadata, IndexEntry, VectorIndex,
};
use lodestone_notes::{NoteRef, NoteSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::error::Result;

/// Outcome of a reindex pass.
///
/// A reindex is best effort across the batch: per-note failures land in
/// `errors` keyed by path and never abort the remaining notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReindexReport {
    /// Notes whose chunks were (re)written.
    pub indexed: usize,

    /// Notes left untouched: unchanged fingerprint or empty body.
    pub skipped: usize,

    /// Total chunks written across all indexed notes.
    pub chunks_written: usize,

    /// Per-note failures, keyed by note path.
    pub errors: BTreeMap<String, String>,

    /// Wall-clock duration of the pass.
    pub duration_ms: u64,
}

/// Builds the id of a chunk's index entry.
pub fn chunk_id(path: &str, seq: usize) -> String {
    format!("{path}:chunk:{seq}")
}

/// Drives notes from a [`NoteSource`] through chunking and embedding into
/// a [`VectorIndex`].
pub struct Indexer {
    source: Arc<dyn NoteSource>,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: Chunker,
}

impl Indexer {
    /// Creates an indexer over the given source, provider, and index.
    pub fn new(
        source: Arc<dyn NoteSource>,
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chunker: Chunker,
    ) -> Self {
        Self {
            source,
            provider,
            index,
            chunker,
        }
    }

    /// Indexes every changed note, returning per-note counts and errors.
    ///
    /// With `force` the fingerprint check is bypassed and every note is
    /// rewritten; the delete-then-upsert sequence makes that idempotent.
    /// That sequence is not atomic, so concurrent reindexing of the same
    /// note must be serialized by the caller. Searches running alongside
    /// a reindex see the old or new chunk set, never a mix.
    pub async fn reindex(&self, force: bool) -> Result<ReindexReport> {
        let started = Instant::now();
        let refs = self.source.list().await?;
        let total = refs.len();
        let mut report = ReindexReport::default();

        for note_ref in refs {
            if !force {
                match self.is_current(&note_ref).await {
                    Ok(true) => {
                        report.skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(path = note_ref.path.as_str(), %err, "fingerprint check failed");
                        report.errors.insert(note_ref.path.clone(), err.to_string());
                        continue;
                    }
                }
            }
            match self.index_note(&note_ref).await {
                // Zero chunks means an empty note; nothing was written.
                Ok(0) => report.skipped += 1,
                Ok(written) => {
                    report.indexed += 1;
                    report.chunks_written += written;
                }
                Err(err) => {
                    warn!(path = note_ref.path.as_str(), %err, "failed to index note");
                    report.errors.insert(note_ref.path.clone(), err.to_string());
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            total,
            indexed = report.indexed,
            skipped = report.skipped,
            chunks = report.chunks_written,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "reindex complete"
        );
        Ok(report)
    }

    /// A note is current when its first chunk entry carries the same
    /// fingerprint the source listing reports.
    async fn is_current(&self, note_ref: &NoteRef) -> Result<bool> {
        let Some(entry) = self.index.get(&chunk_id(&note_ref.path, 0)).await? else {
            return Ok(false);
        };
        Ok(entry.metadata.fingerprint == note_ref.fingerprint)
    }

    /// Rewrites a single note's entries, returning how many chunks were
    /// written. Embedding happens in one batched call per note.
    async fn index_note(&self, note_ref: &NoteRef) -> Result<usize> {
        let note = self.source.read(&note_ref.path).await?;

        // Stale entries go first so a shrinking note leaves no orphans.
        self.index
            .delete_where(&EntryFilter::for_path(&note_ref.path))
            .await?;

        let chunks = self.chunker.chunk(&note.body);
        if chunks.is_empty() {
            debug!(path = note_ref.path.as_str(), "note has no content to index");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.provider.embed(&texts).await?;

        let mut entries = Vec::with_capacity(chunks.len());
        for (seq, (chunk, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            entries.push(IndexEntry {
                id: chunk_id(&note.path, seq),
                embedding,
                text: chunk.text,
                metadata: EntryMetadata {
                    path: note.path.clone(),
                    seq,
                    heading: chunk.heading,
                    tags: note.tags.clone(),
                    fingerprint: note.fingerprint.clone(),
                },
            });
        }

        let written = entries.len();
        self.index.upsert(entries).await?;
        debug!(path = note.path.as_str(), chunks = written, "indexed note");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use lodestone_embeddings::{HashingProvider, MemoryIndex};
    use lodestone_notes::{Note, NoteError, Vault};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn write_note(root: &std::path::Path, relative: &str, content: &str) {
        let full = root.join(relative);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    fn indexer_for(dir: &TempDir) -> (Indexer, Arc<MemoryIndex>) {
        let provider = Arc::new(HashingProvider::new());
        let index = Arc::new(MemoryIndex::new(provider.dimension()));
        let indexer = Indexer::new(
            Arc::new(Vault::new(dir.path())),
            provider,
            index.clone(),
            Chunker::default(),
        );
        (indexer, index)
    }

    #[tokio::test]
    async fn reindex_writes_chunks_for_every_note() {
        let dir = TempDir::new().unwrap();
        write_note(dir.path(), "a.md", "# One\nalpha text");
        write_note(dir.path(), "sub/b.md", "# Two\nbeta text");
        let (indexer, index) = indexer_for(&dir);

        let report = indexer.reindex(false).await.unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.chunks_written, 2);
        assert!(report.errors.is_empty());
        assert_eq!(index.count().await.unwrap(), 2);

        let entry = index.get("a.md:chunk:0").await.unwrap().unwrap();
        assert_eq!(entry.metadata.heading, "One");
        assert_eq!(entry.text, "alpha text");
    }

    #[tokio::test]
    async fn unchanged_notes_are_skipped() {
        let dir = TempDir::new().unwrap();
        write_note(dir.path(), "a.md", "alpha");
        write_note(dir.path(), "b.md", "beta");
        let (indexer, _index) = indexer_for(&dir);

        indexer.reindex(false).await.unwrap();
        let second = indexer.reindex(false).await.unwrap();

        assert_eq!(second.indexed, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.chunks_written, 0);
    }

    #[tokio::test]
    async fn empty_notes_count_as_skipped() {
        let dir = TempDir::new().unwrap();
        write_note(dir.path(), "empty.md", "");
        let (indexer, index) = indexer_for(&dir);

        let report = indexer.reindex(false).await.unwrap();

        assert_eq!(report.indexed, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    struct FlakySource {
        vault: Vault,
        fail_path: String,
    }

    #[async_trait]
    impl NoteSource for FlakySource {
        async fn list(&self) -> lodestone_notes::Result<Vec<NoteRef>> {
            self.vault.list().await
        }

        async fn read(&self, path: &str) -> lodestone_notes::Result<Note> {
            if path == self.fail_path {
                return Err(NoteError::NotFound(path.to_string()));
            }
            self.vault.read(path).await
        }
    }

    #[tokio::test]
    async fn read_failures_are_collected_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_note(dir.path(), "good.md", "fine content");
        write_note(dir.path(), "broken.md", "unreadable");
        let provider = Arc::new(HashingProvider::new());
        let index = Arc::new(MemoryIndex::new(provider.dimension()));
        let source = FlakySource {
            vault: Vault::new(dir.path()),
            fail_path: "broken.md".to_string(),
        };
        let indexer = Indexer::new(Arc::new(source), provider, index.clone(), Chunker::default());

        let report = indexer.reindex(false).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert!(report.errors.contains_key("broken.md"), "got {report:?}");
        assert!(index.get("good.md:chunk:0").await.unwrap().is_some());
    }
}
