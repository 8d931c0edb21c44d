//! Error types for vault access.

use thiserror::Error;

/// Errors that can occur while reading notes from a vault.
#[derive(Error, Debug)]
pub enum NoteError {
    /// The requested note does not exist in the vault.
    #[error("note not found: {0}")]
    NotFound(String),

    /// The path resolves outside the vault root.
    #[error("path escapes the vault: {0}")]
    OutsideVault(String),

    /// Directory traversal failed.
    #[error("vault walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Underlying file system error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for note operations.
pub type Result<T> = std::result::Result<T, NoteError>;
