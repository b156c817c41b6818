//! Index factories and embedder selection for SmartSource.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use smartsource_config::{
    Config, ConfigLoader, EmbeddingConfig, EmbeddingProviderKind, IndexBackend, IndexConfig,
};
use smartsource_embedding_openai::{OpenAIEmbedding, OpenAIEmbeddingConfig};
use smartsource_index_elasticsearch::ElasticsearchIndex;
use smartsource_index_memory::{HashEmbedding, MemoryIndex};
use smartsource_protocols::{EmbeddingProvider, IndexClient, SearchError};
use smartsource_retrieval::{IndexFactory, IndexRegistry};

/// Builds Elasticsearch-backed indexes.
pub(crate) struct ElasticsearchFactory;

#[async_trait]
impl IndexFactory for ElasticsearchFactory {
    fn backend(&self) -> IndexBackend {
        IndexBackend::Elasticsearch
    }

    async fn create(
        &self,
        index: &IndexConfig,
        config: &Config,
        _embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Arc<dyn IndexClient>, SearchError> {
        let client = ElasticsearchIndex::from_config(index, &config.elasticsearch).map_err(|e| {
            SearchError::Configuration(format!("index '{}': {}", index.id, e))
        })?;
        info!(index = %index.id, url = %client.search_url(), "Elasticsearch index configured");
        Ok(Arc::new(client))
    }
}

/// Builds in-memory indexes from JSON document files.
pub(crate) struct MemoryFactory;

#[async_trait]
impl IndexFactory for MemoryFactory {
    fn backend(&self) -> IndexBackend {
        IndexBackend::Memory
    }

    async fn create(
        &self,
        index: &IndexConfig,
        _config: &Config,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Arc<dyn IndexClient>, SearchError> {
        let path = index.documents.as_ref().ok_or_else(|| {
            SearchError::Configuration(format!("memory index '{}' has no documents file", index.id))
        })?;
        let path = ConfigLoader::expand_path(path);

        // Keyword-only indexes skip embedding at load.
        let embedder = if index.vector { embedder } else { None };

        let client = MemoryIndex::load(&index.id, &path, embedder)
            .await
            .map_err(|e| SearchError::Configuration(format!("index '{}': {}", index.id, e)))?;
        Ok(Arc::new(client))
    }
}

/// Registry with a factory for every supported backend.
pub(crate) fn index_registry() -> IndexRegistry {
    let registry = IndexRegistry::new();
    registry.register_factory(Arc::new(ElasticsearchFactory));
    registry.register_factory(Arc::new(MemoryFactory));
    registry
}

/// Build the configured embedder, if any.
pub(crate) fn build_embedder(config: &EmbeddingConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::OpenAI | EmbeddingProviderKind::Azure => {
            let settings = OpenAIEmbeddingConfig::from_config(config)?;
            info!(
                provider = ?config.provider,
                model = %settings.model,
                "Using OpenAI embedding provider"
            );
            Some(Arc::new(OpenAIEmbedding::new(settings)))
        }
        EmbeddingProviderKind::Hash => {
            warn!("Using hash embeddings; vector results are not semantic");
            Some(Arc::new(HashEmbedding::new(config.dimension)))
        }
        EmbeddingProviderKind::None => {
            info!("No embedding provider configured; vector search disabled");
            None
        }
    }
}
