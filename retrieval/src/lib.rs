//! # Lodestone Retrieval
//!
//! Semantic search over a vault of plain-text notes. Notes are chunked,
//! embedded, and stored in a vector index; queries come back as ranked
//! results or as a budget-constrained context bundle ready to paste into
//! a prompt.
//!
//! ## Architecture
//!
//! ```text
//!   vault (lodestone-notes)
//!        |
//!        v
//!   Chunker ──> Indexer ──> VectorIndex (lodestone-embeddings)
//!                               |
//!              ┌────────────────┴────────────────┐
//!              v                                 v
//!        SearchEngine                      ContextBuilder
//!     ranked, deduped results         budgeted context bundle
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lodestone_retrieval::{EngineConfig, VaultEngine};
//!
//! let engine = VaultEngine::builder()
//!     .with_config(EngineConfig::new("~/notes"))
//!     .build()
//!     .await?;
//!
//! engine.reindex(false).await?;
//! let results = engine.search("vector index design").await?;
//! let context = engine.build_context("vector index design").await?;
//! println!("{}", context.render());
//! ```

pub mod chunker;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod search;

pub use chunker::{Chunk, Chunker, ChunkerConfig};
pub use config::EngineConfig;
pub use context::{ContextBuilder, ContextBundle, ContextOptions, ContextSection};
pub use engine::{EngineStats, VaultEngine, VaultEngineBuilder};
pub use error::{Result, RetrievalError};
pub use indexer::{Indexer, ReindexReport, chunk_id};
pub use search::{SearchEngine, SearchOptions, SearchResult};

// Re-export from dependencies for convenience
pub use lodestone_embeddings::{
    EmbeddingProvider, HashingProvider, MemoryIndex, OpenAIProvider, VectorIndex,
};
pub use lodestone_notes::{Note, NoteSource, Vault, VaultConfig};
