//! The vault engine: one handle over indexing, search, and context.

use std::sync::Arc;

use lodestone_embeddings::{EmbeddingProvider, MemoryIndex, OpenAIProvider, VectorIndex};
use lodestone_notes::{NoteSource, Vault};
use tracing::{debug, info};

use crate::chunker::Chunker;
use crate::config::EngineConfig;
use crate::context::{ContextBuilder, ContextBundle, ContextOptions};
use crate::error::Result;
use crate::indexer::{Indexer, ReindexReport};
use crate::search::{SearchEngine, SearchOptions, SearchResult};

/// Facade over the whole retrieval pipeline.
///
/// The engine wires a note source, an embedding provider, and a vector
/// index into the indexer, search, and context components, and exposes
/// their operations behind one handle. Components not supplied to the
/// builder get sensible defaults: a [`Vault`] over the configured
/// directory, an [`OpenAIProvider`], and an in-memory index.
pub struct VaultEngine {
    /// Configuration the engine was built with.
    config: EngineConfig,

    /// Where notes come from.
    source: Arc<dyn NoteSource>,

    /// Embedding provider shared by indexing and querying.
    provider: Arc<dyn EmbeddingProvider>,

    /// Vector index shared by all components.
    index: Arc<dyn VectorIndex>,

    /// Concrete handle kept when the engine owns the default in-memory
    /// index, so snapshots can be written.
    memory: Option<Arc<MemoryIndex>>,

    indexer: Indexer,
    search: SearchEngine,
    context: ContextBuilder,
}

impl VaultEngine {
    /// Creates a builder.
    pub fn builder() -> VaultEngineBuilder {
        VaultEngineBuilder::new()
    }

    /// Builds an engine from a configuration with default components.
    pub async fn new(config: EngineConfig) -> Result<Self> {
        Self::builder().with_config(config).build().await
    }

    /// Indexes changed notes; see [`Indexer::reindex`].
    pub async fn reindex(&self, force: bool) -> Result<ReindexReport> {
        self.indexer.reindex(force).await
    }

    /// Searches with the configured default options.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search.search(query).await
    }

    /// Searches with explicit options.
    pub async fn search_with(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        self.search.search_with(query, options).await
    }

    /// Builds query context with the configured default options.
    pub async fn build_context(&self, query: &str) -> Result<ContextBundle> {
        self.context.build(query).await
    }

    /// Builds query context with explicit options.
    pub async fn build_context_with(
        &self,
        query: &str,
        options: ContextOptions,
    ) -> Result<ContextBundle> {
        self.context.build_with(query, options).await
    }

    /// Writes the in-memory index to the configured snapshot path.
    ///
    /// A no-op when no snapshot path is configured or when a custom index
    /// backend was supplied to the builder.
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.config.index_path else {
            return Ok(());
        };
        let Some(memory) = &self.memory else {
            debug!("custom index backend; snapshot not written");
            return Ok(());
        };
        memory.save(path).await?;
        info!(path = %path.display(), "index snapshot written");
        Ok(())
    }

    /// Counts of what the engine can see right now.
    pub async fn stats(&self) -> Result<EngineStats> {
        let documents = self.source.list().await?.len();
        let entries = self.index.count().await?;
        Ok(EngineStats {
            documents,
            entries,
            dimension: self.provider.dimension(),
            provider: self.provider.name().to_string(),
        })
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Builder for [`VaultEngine`].
pub struct VaultEngineBuilder {
    config: EngineConfig,
    source: Option<Arc<dyn NoteSource>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
}

impl VaultEngineBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            source: None,
            provider: None,
            index: None,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Supplies a note source instead of the default vault.
    pub fn with_source(mut self, source: Arc<dyn NoteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Supplies an embedding provider instead of the default OpenAI one.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Supplies a vector index backend instead of the in-memory default.
    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Builds the engine, loading the index snapshot when configured.
    pub async fn build(self) -> Result<VaultEngine> {
        let config = self.config;
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(OpenAIProvider::new()));

        let (index, memory): (Arc<dyn VectorIndex>, Option<Arc<MemoryIndex>>) = match self.index {
            Some(index) => (index, None),
            None => {
                let memory = match &config.index_path {
                    Some(path) if path.exists() => {
                        let loaded = MemoryIndex::load(path, provider.dimension()).await?;
                        info!(path = %path.display(), "loaded index snapshot");
                        Arc::new(loaded)
                    }
                    _ => Arc::new(MemoryIndex::new(provider.dimension())),
                };
                (memory.clone(), Some(memory))
            }
        };

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(Vault::new(&config.vault_dir)));

        let indexer = Indexer::new(
            source.clone(),
            provider.clone(),
            index.clone(),
            Chunker::new(config.chunker.clone()),
        );
        let search =
            SearchEngine::new(provider.clone(), index.clone()).with_defaults(config.search.clone());
        let context = ContextBuilder::new(provider.clone(), index.clone())
            .with_defaults(config.context.clone());

        info!(
            vault = %config.vault_dir.display(),
            provider = provider.name(),
            "vault engine ready"
        );
        Ok(VaultEngine {
            config,
            source,
            provider,
            index,
            memory,
            indexer,
            search,
            context,
        })
    }
}

impl Default for VaultEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about an engine.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Notes visible to the source.
    pub documents: usize,

    /// Entries in the vector index.
    pub entries: usize,

    /// Embedding dimension in use.
    pub dimension: usize,

    /// Name of the embedding provider.
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use lodestone_embeddings::HashingProvider;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn builds_with_defaulted_components() {
        let dir = TempDir::new().unwrap();

        let engine = VaultEngine::builder()
            .with_config(EngineConfig::new(dir.path()))
            .build()
            .await
            .unwrap();

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.provider, "openai");
        assert_eq!(stats.dimension, 1536);
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_persist() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "# One\nalpha text").unwrap();
        let snapshot = dir.path().join("state").join("index.json");
        let config = EngineConfig::new(dir.path()).with_index_path(&snapshot);

        let engine = VaultEngine::builder()
            .with_config(config.clone())
            .with_provider(Arc::new(HashingProvider::new()))
            .build()
            .await
            .unwrap();
        engine.reindex(false).await.unwrap();
        engine.persist().await.unwrap();
        assert!(snapshot.exists());

        let reloaded = VaultEngine::builder()
            .with_config(config)
            .with_provider(Arc::new(HashingProvider::new()))
            .build()
            .await
            .unwrap();
        let stats = reloaded.stats().await.unwrap();
        assert_eq!(stats.entries, 1);

        let results = reloaded.search("alpha").await.unwrap();
        assert_eq!(results.len(), 1, "reloaded index should be searchable");
    }

    #[tokio::test]
    async fn persist_is_a_noop_for_custom_index_backends() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("index.json");
        let provider = Arc::new(HashingProvider::new());
        let index = Arc::new(lodestone_embeddings::MemoryIndex::new(provider.dimension()));

        let engine = VaultEngine::builder()
            .with_config(EngineConfig::new(dir.path()).with_index_path(&snapshot))
            .with_provider(provider)
            .with_index(index)
            .build()
            .await
            .unwrap();

        engine.persist().await.unwrap();
        assert!(!snapshot.exists());
    }
}
