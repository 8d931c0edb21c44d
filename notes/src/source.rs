//! Source abstraction over note storage.

use async_trait::async_trait;

use crate::error::Result;
use crate::note::{Note, NoteRef};

/// A store of notes that can be listed and read.
///
/// The indexing pipeline only needs these two operations, which keeps the
/// pipeline testable against fixture directories or in-memory fakes.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Lists every note the source knows about.
    async fn list(&self) -> Result<Vec<NoteRef>>;

    /// Reads a single note by its source-relative path.
    async fn read(&self, path: &str) -> Result<Note>;
}
