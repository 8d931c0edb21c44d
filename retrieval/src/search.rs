//! Ranked semantic search over the vector index.

use std::collections::HashSet;
use std::sync::Arc;

use lodestone_embeddings::{EmbeddingProvider, EntryFilter, VectorIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};

/// Length of result snippets, in characters.
const SNIPPET_CHARS: usize = 200;

/// Candidates fetched per requested result, to absorb filtering and
/// per-document deduplication losses.
const OVER_FETCH_FACTOR: usize = 2;

/// Knobs for a search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of distinct notes to return.
    pub limit: usize,

    /// Results scoring below this are dropped.
    pub min_score: f32,

    /// When non-empty, only notes tagged with at least one of these.
    pub tags: Vec<String>,

    /// When set, only notes whose path contains this substring.
    pub path_contains: Option<String>,
}

impl SearchOptions {
    /// Sets the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the minimum similarity score.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Adds a tag to filter by.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Restricts results to paths containing a substring.
    pub fn with_path_contains(mut self, fragment: impl Into<String>) -> Self {
        self.path_contains = Some(fragment.into());
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.3,
            tags: Vec::new(),
            path_contains: None,
        }
    }
}

/// One matched note: its best-scoring chunk plus note metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Note path.
    pub path: String,

    /// Heading of the best-matching chunk; may be empty.
    pub heading: String,

    /// Leading characters of the best-matching chunk.
    pub snippet: String,

    /// Similarity score in [0, 1], higher is closer.
    pub score: f32,

    /// Tags of the note.
    pub tags: Vec<String>,
}

/// Embeds queries and ranks index entries against them.
pub struct SearchEngine {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    defaults: SearchOptions,
}

impl SearchEngine {
    /// Creates a search engine with default options.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            provider,
            index,
            defaults: SearchOptions::default(),
        }
    }

    /// Replaces the default options used by [`SearchEngine::search`].
    pub fn with_defaults(mut self, options: SearchOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Searches with the engine's default options.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with(query, self.defaults.clone()).await
    }

    /// Searches with explicit options.
    ///
    /// Returns at most `limit` results, one per note, in descending score
    /// order. An index with no entries yields [`RetrievalError::NotIndexed`];
    /// a query that simply matches nothing yields an empty list.
    pub async fn search_with(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        if self.index.count().await? == 0 {
            return Err(RetrievalError::NotIndexed);
        }

        let embedding = self.provider.embed_one(query).await?;
        let filter = build_filter(&options);
        let fetch = options.limit.max(1) * OVER_FETCH_FACTOR;
        let candidates = self.index.query(&embedding, fetch, filter.as_ref()).await?;

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for candidate in candidates {
            let score = (1.0 - candidate.distance).clamp(0.0, 1.0);
            // Candidates arrive in ascending distance order, so the first
            // score below the floor ends the scan.
            if score < options.min_score {
                break;
            }
            if !seen.insert(candidate.metadata.path.clone()) {
                continue;
            }
            results.push(SearchResult {
                path: candidate.metadata.path,
                heading: candidate.metadata.heading,
                snippet: snippet(&candidate.text),
                score,
                tags: candidate.metadata.tags,
            });
            if results.len() == options.limit {
                break;
            }
        }

        debug!(query, results = results.len(), "search complete");
        Ok(results)
    }
}

fn build_filter(options: &SearchOptions) -> Option<EntryFilter> {
    let mut filter = EntryFilter::default();
    let mut any = false;
    if !options.tags.is_empty() {
        filter.tags_any = Some(options.tags.clone());
        any = true;
    }
    if let Some(fragment) = &options.path_contains {
        filter.path_contains = Some(fragment.clone());
        any = true;
    }
    any.then_some(filter)
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use lodestone_embeddings::{EntryMetadata, HashingProvider, IndexEntry, MemoryIndex};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::indexer::chunk_id;

    struct Doc {
        path: &'static str,
        seq: usize,
        text: &'static str,
        tags: &'static [&'static str],
    }

    async fn engine_with(docs: &[Doc]) -> SearchEngine {
        let provider = Arc::new(HashingProvider::new());
        let index = Arc::new(MemoryIndex::new(provider.dimension()));
        let mut entries = Vec::new();
        for doc in docs {
            let embedding = provider.embed_one(doc.text).await.unwrap();
            entries.push(IndexEntry {
                id: chunk_id(doc.path, doc.seq),
                embedding,
                text: doc.text.to_string(),
                metadata: EntryMetadata {
                    path: doc.path.to_string(),
                    seq: doc.seq,
                    heading: String::new(),
                    tags: doc.tags.iter().map(|tag| (*tag).to_string()).collect(),
                    fingerprint: "f".to_string(),
                },
            });
        }
        if !entries.is_empty() {
            index.upsert(entries).await.unwrap();
        }
        SearchEngine::new(provider, index)
    }

    #[tokio::test]
    async fn empty_index_is_not_indexed() {
        let engine = engine_with(&[]).await;

        let err = engine.search("anything").await.unwrap_err();
        assert!(matches!(err, RetrievalError::NotIndexed), "got {err:?}");
    }

    #[tokio::test]
    async fn matching_nothing_is_empty_not_an_error() {
        let engine = engine_with(&[Doc {
            path: "a.md",
            seq: 0,
            text: "tomato basil pasta",
            tags: &[],
        }])
        .await;

        let results = engine
            .search_with("zebra quantum", SearchOptions::default().with_min_score(0.9))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn deduplicates_by_path_keeping_the_best_chunk() {
        let engine = engine_with(&[
            Doc {
                path: "a.md",
                seq: 0,
                text: "apple banana",
                tags: &[],
            },
            Doc {
                path: "a.md",
                seq: 1,
                text: "apple banana cherry",
                tags: &[],
            },
            Doc {
                path: "b.md",
                seq: 0,
                text: "apple",
                tags: &[],
            },
        ])
        .await;

        let results = engine.search("apple banana").await.unwrap();

        let paths: Vec<&str> = results.iter().map(|result| result.path.as_str()).collect();
        assert_eq!(paths, vec!["a.md", "b.md"]);
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[0].snippet, "apple banana");
        for result in &results {
            assert!((0.0..=1.0).contains(&result.score));
        }
    }

    #[tokio::test]
    async fn tag_filter_narrows_results() {
        let engine = engine_with(&[
            Doc {
                path: "work.md",
                seq: 0,
                text: "meeting notes",
                tags: &["work"],
            },
            Doc {
                path: "home.md",
                seq: 0,
                text: "meeting the neighbors",
                tags: &["personal"],
            },
        ])
        .await;

        let results = engine
            .search_with("meeting", SearchOptions::default().with_tag("work"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "work.md");
        assert_eq!(results[0].tags, vec!["work"]);
    }

    #[tokio::test]
    async fn path_filter_narrows_results() {
        let engine = engine_with(&[
            Doc {
                path: "projects/engine.md",
                seq: 0,
                text: "engine design",
                tags: &[],
            },
            Doc {
                path: "journal/today.md",
                seq: 0,
                text: "engine trouble today",
                tags: &[],
            },
        ])
        .await;

        let results = engine
            .search_with(
                "engine",
                SearchOptions::default().with_path_contains("projects/"),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "projects/engine.md");
    }

    #[tokio::test]
    async fn limit_caps_distinct_notes() {
        let engine = engine_with(&[
            Doc {
                path: "a.md",
                seq: 0,
                text: "shared words here",
                tags: &[],
            },
            Doc {
                path: "b.md",
                seq: 0,
                text: "shared words here",
                tags: &[],
            },
            Doc {
                path: "c.md",
                seq: 0,
                text: "shared words here",
                tags: &[],
            },
        ])
        .await;

        let results = engine
            .search_with("shared words", SearchOptions::default().with_limit(2))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
    }
}
