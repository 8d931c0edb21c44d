//! Budget-constrained context assembly.
//!
//! Where search answers "which notes match", context assembly answers
//! "what should a prompt contain": the best chunks across the whole
//! index, attributed to their notes, packed under chunk and character
//! budgets. Unlike search it never deduplicates by note, because two
//! chunks of the same note can both carry useful context.

use std::sync::Arc;

use lodestone_embeddings::{EmbeddingProvider, VectorIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};

/// A final chunk is truncated to fit the character budget only when at
/// least this much budget remains; shorter tails are dropped instead.
const PARTIAL_APPEND_MIN_CHARS: usize = 100;

/// Candidates fetched per budgeted chunk slot.
const OVER_FETCH_FACTOR: usize = 2;

/// Budgets and floor for a context build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Maximum number of chunks in the bundle.
    pub max_chunks: usize,

    /// Maximum total characters of chunk text in the bundle.
    pub max_chars: usize,

    /// Chunks scoring below this are ignored. Looser than the search
    /// floor, since assembly favors recall.
    pub min_relevance: f32,
}

impl ContextOptions {
    /// Sets the chunk budget.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Sets the character budget.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Sets the relevance floor.
    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_chunks: 8,
            max_chars: 4000,
            min_relevance: 0.25,
        }
    }
}

/// One chunk in a context bundle, attributed to its note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSection {
    /// Note path.
    pub path: String,

    /// Heading of the chunk's section; may be empty.
    pub heading: String,

    /// Chunk text, possibly truncated to fit the character budget.
    pub text: String,

    /// Similarity score in [0, 1].
    pub score: f32,
}

/// The assembled context for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    /// The query the bundle was built for.
    pub query: String,

    /// Sections in descending score order.
    pub sections: Vec<ContextSection>,

    /// Total characters of section text.
    pub total_chars: usize,
}

impl ContextBundle {
    /// True when no candidate cleared the relevance floor.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Renders the bundle as markdown, one attributed block per section.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if section.heading.is_empty() {
                out.push_str(&format!("### {}\n", section.path));
            } else {
                out.push_str(&format!("### {} > {}\n", section.path, section.heading));
            }
            out.push_str(&section.text);
            out.push_str("\n\n");
        }
        out
    }
}

/// Assembles query context from the best-matching chunks in the index.
pub struct ContextBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    defaults: ContextOptions,
}

impl ContextBuilder {
    /// Creates a context builder with default options.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            provider,
            index,
            defaults: ContextOptions::default(),
        }
    }

    /// Replaces the default options used by [`ContextBuilder::build`].
    pub fn with_defaults(mut self, options: ContextOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Builds context with the builder's default options.
    pub async fn build(&self, query: &str) -> Result<ContextBundle> {
        self.build_with(query, self.defaults.clone()).await
    }

    /// Builds context with explicit options.
    ///
    /// The bundle never exceeds either budget. When no candidate clears
    /// the relevance floor the bundle is empty, which is not an error; an
    /// index with no entries at all is [`RetrievalError::NotIndexed`].
    pub async fn build_with(&self, query: &str, options: ContextOptions) -> Result<ContextBundle> {
        if self.index.count().await? == 0 {
            return Err(RetrievalError::NotIndexed);
        }

        let embedding = self.provider.embed_one(query).await?;
        let fetch = options.max_chunks.max(1) * OVER_FETCH_FACTOR;
        let candidates = self.index.query(&embedding, fetch, None).await?;

        let mut sections = Vec::new();
        let mut total_chars = 0usize;
        for candidate in candidates {
            if sections.len() == options.max_chunks {
                break;
            }
            let score = (1.0 - candidate.distance).clamp(0.0, 1.0);
            // Candidates arrive in ascending distance order, so the first
            // score below the floor ends the scan.
            if score < options.min_relevance {
                break;
            }
            let text_chars = candidate.text.chars().count();
            let remaining = options.max_chars.saturating_sub(total_chars);
            if text_chars > remaining {
                if remaining >= PARTIAL_APPEND_MIN_CHARS {
                    let truncated: String = candidate.text.chars().take(remaining).collect();
                    total_chars += remaining;
                    sections.push(ContextSection {
                        path: candidate.metadata.path,
                        heading: candidate.metadata.heading,
                        text: truncated,
                        score,
                    });
                }
                break;
            }
            total_chars += text_chars;
            sections.push(ContextSection {
                path: candidate.metadata.path,
                heading: candidate.metadata.heading,
                text: candidate.text,
                score,
            });
        }

        debug!(
            query,
            sections = sections.len(),
            total_chars,
            "context assembled"
        );
        Ok(ContextBundle {
            query: query.to_string(),
            sections,
            total_chars,
        })
    }
}

#[cfg(test)]
mod tests {
    use lodestone_embeddings::{EntryMetadata, HashingProvider, IndexEntry, MemoryIndex};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::indexer::chunk_id;

    /// Entries with identical single-word texts all sit at distance zero
    /// from the matching query, so ordering falls back to ids and the
    /// tests below are deterministic.
    async fn builder_with(texts: &[(&str, usize, String)]) -> ContextBuilder {
        let provider = Arc::new(HashingProvider::new());
        let index = Arc::new(MemoryIndex::new(provider.dimension()));
        let mut entries = Vec::new();
        for (path, seq, text) in texts {
            let embedding = provider.embed_one(text).await.unwrap();
            entries.push(IndexEntry {
                id: chunk_id(path, *seq),
                embedding,
                text: text.clone(),
                metadata: EntryMetadata {
                    path: (*path).to_string(),
                    seq: *seq,
                    heading: "Kitchen".to_string(),
                    tags: Vec::new(),
                    fingerprint: "f".to_string(),
                },
            });
        }
        if !entries.is_empty() {
            index.upsert(entries).await.unwrap();
        }
        ContextBuilder::new(provider, index)
    }

    #[tokio::test]
    async fn empty_index_is_not_indexed() {
        let builder = builder_with(&[]).await;

        let err = builder.build("anything").await.unwrap_err();
        assert!(matches!(err, RetrievalError::NotIndexed), "got {err:?}");
    }

    #[tokio::test]
    async fn nothing_above_the_floor_is_an_empty_bundle() {
        let builder =
            builder_with(&[("a.md", 0, "tomato basil pasta with olive oil".to_string())]).await;

        let bundle = builder
            .build_with(
                "zebra quantum",
                ContextOptions::default().with_min_relevance(0.95),
            )
            .await
            .unwrap();
        assert!(bundle.is_empty());
        assert_eq!(bundle.total_chars, 0);
    }

    #[tokio::test]
    async fn chunk_budget_caps_sections_without_dedup() {
        let builder = builder_with(&[
            ("a.md", 0, "x ".repeat(25)),
            ("a.md", 1, "x ".repeat(25)),
            ("b.md", 0, "x ".repeat(25)),
        ])
        .await;

        let bundle = builder
            .build_with("x", ContextOptions::default().with_max_chunks(2))
            .await
            .unwrap();

        assert_eq!(bundle.sections.len(), 2);
        // Both chunks of a.md are kept; context does not dedup by note.
        assert_eq!(bundle.sections[0].path, "a.md");
        assert_eq!(bundle.sections[1].path, "a.md");
        assert_eq!(bundle.total_chars, 100);
    }

    #[tokio::test]
    async fn short_leftover_budget_stops_without_a_partial() {
        let builder = builder_with(&[("a.md", 0, "x ".repeat(100)), ("b.md", 0, "x ".repeat(100))])
            .await;

        let bundle = builder
            .build_with("x", ContextOptions::default().with_max_chars(250))
            .await
            .unwrap();

        assert_eq!(bundle.sections.len(), 1, "50 leftover chars is too few");
        assert_eq!(bundle.total_chars, 200);
    }

    #[tokio::test]
    async fn ample_leftover_budget_appends_a_truncated_tail() {
        let builder = builder_with(&[("a.md", 0, "x ".repeat(100)), ("b.md", 0, "x ".repeat(100))])
            .await;

        let bundle = builder
            .build_with("x", ContextOptions::default().with_max_chars(350))
            .await
            .unwrap();

        assert_eq!(bundle.sections.len(), 2);
        assert_eq!(bundle.sections[1].text.chars().count(), 150);
        assert_eq!(bundle.total_chars, 350);
    }

    #[tokio::test]
    async fn render_attributes_each_section() {
        let builder = builder_with(&[("a.md", 0, "x ".repeat(15))]).await;

        let bundle = builder.build("x").await.unwrap();
        let rendered = bundle.render();

        assert!(rendered.starts_with("### a.md > Kitchen\n"), "{rendered}");
        assert!(rendered.contains(&"x ".repeat(15)));
    }
}
