//! # Embeddings
//!
//! Embedding providers and the vector index behind Lodestone's semantic
//! search.
//!
//! ## Features
//!
//! - **Providers**: OpenAI-compatible API or an offline hashing provider
//! - **Vector index**: typed-metadata entries, cosine nearest-neighbor
//!   queries, JSON snapshots
//! - **Caching**: batched cache layer over any provider
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Embedding layer                        │
//! ├────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► VectorIndex           │
//! │        │                                  │                │
//! │        ▼                                  ▼                │
//! │  OpenAI / Hashing                   MemoryIndex            │
//! │  (CachedProvider wraps either)      (JSON snapshots)       │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use cache::{CachedProvider, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use index::{EntryFilter, EntryMetadata, IndexEntry, MemoryIndex, ScoredEntry, VectorIndex};
pub use provider::{EmbeddingProvider, HashingProvider, OpenAIProvider};
pub use similarity::{cosine_distance, cosine_similarity, normalize};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of the default OpenAI embedding model.
pub const DEFAULT_DIMENSION: usize = 1536;
