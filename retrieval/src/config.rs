//! Configuration for the vault engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chunker::ChunkerConfig;
use crate::context::ContextOptions;
use crate::search::SearchOptions;

/// Top-level configuration for a [`crate::engine::VaultEngine`].
///
/// Everything here serializes cleanly, so a config can live in a JSON
/// file next to the vault it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory scanned for notes.
    pub vault_dir: PathBuf,

    /// Optional snapshot file for the in-memory index. When set, the
    /// engine loads it at build time and [`crate::engine::VaultEngine::persist`]
    /// writes it back.
    pub index_path: Option<PathBuf>,

    /// Chunking parameters.
    pub chunker: ChunkerConfig,

    /// Default search options.
    pub search: SearchOptions,

    /// Default context assembly options.
    pub context: ContextOptions,
}

impl EngineConfig {
    /// Creates a configuration for the given vault directory.
    pub fn new(vault_dir: impl Into<PathBuf>) -> Self {
        Self {
            vault_dir: vault_dir.into(),
            index_path: None,
            chunker: ChunkerConfig::default(),
            search: SearchOptions::default(),
            context: ContextOptions::default(),
        }
    }

    /// Sets the index snapshot path.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Sets the chunking parameters.
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// Sets the default search options.
    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    /// Sets the default context options.
    pub fn with_context(mut self, context: ContextOptions) -> Self {
        self.context = context;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(dirs::home_dir().unwrap_or_default().join("notes"))
    }
}
