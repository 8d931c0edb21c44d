//! Error types for the retrieval pipeline.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while indexing, searching, or building context.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Note access error.
    #[error("note error: {0}")]
    Note(#[from] lodestone_notes::NoteError),

    /// Embedding provider or vector index error.
    #[error("embedding error: {0}")]
    Embedding(#[from] lodestone_embeddings::EmbeddingError),

    /// The index holds no entries; a reindex has to run first.
    #[error("vault is not indexed yet")]
    NotIndexed,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
