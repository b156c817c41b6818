//! Index registry.
//!
//! Holds the index clients the planner can target, keyed by index id, and
//! the per-backend factories used to build them from configuration.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use smartsource_config::{Config, IndexBackend, IndexConfig};
use smartsource_protocols::{EmbeddingProvider, IndexClient, SearchError};

use crate::planner::PlanTarget;
use crate::retry::{RetryPolicy, RetryingIndexClient};

/// Builds index clients for one backend kind.
#[async_trait]
pub trait IndexFactory: Send + Sync {
    fn backend(&self) -> IndexBackend;

    async fn create(
        &self,
        index: &IndexConfig,
        config: &Config,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Arc<dyn IndexClient>, SearchError>;
}

/// Registration flags for one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub searchable: bool,
    pub vector: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            searchable: true,
            vector: true,
        }
    }
}

struct RegisteredIndex {
    client: Arc<dyn IndexClient>,
    options: IndexOptions,
}

/// Registry of index clients.
pub struct IndexRegistry {
    indexes: DashMap<String, RegisteredIndex>,
    factories: DashMap<IndexBackend, Arc<dyn IndexFactory>>,
}

impl IndexRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            indexes: DashMap::new(),
            factories: DashMap::new(),
        }
    }

    /// Register a client under its own id.
    ///
    /// Returns an error if an index with the same id is already registered.
    pub fn register(
        &self,
        client: Arc<dyn IndexClient>,
        options: IndexOptions,
    ) -> Result<(), SearchError> {
        let id = client.id().to_string();

        if self.indexes.contains_key(&id) {
            return Err(SearchError::Configuration(format!(
                "index '{}' is already registered",
                id
            )));
        }

        self.indexes
            .insert(id, RegisteredIndex { client, options });
        Ok(())
    }

    /// Unregister an index by id.
    pub fn unregister(&self, id: &str) -> Result<(), SearchError> {
        self.indexes
            .remove(id)
            .ok_or_else(|| SearchError::Configuration(format!("unknown index '{}'", id)))?;
        Ok(())
    }

    /// Mark an index as searchable or hidden from the planner.
    pub fn set_searchable(&self, id: &str, searchable: bool) -> Result<(), SearchError> {
        let mut entry = self
            .indexes
            .get_mut(id)
            .ok_or_else(|| SearchError::Configuration(format!("unknown index '{}'", id)))?;
        entry.options.searchable = searchable;
        Ok(())
    }

    /// Get a client by index id.
    pub fn client(&self, id: &str) -> Option<Arc<dyn IndexClient>> {
        self.indexes.get(id).map(|entry| entry.client.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.indexes.contains_key(id)
    }

    /// Registered index ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Searchable indexes, sorted by id.
    pub fn targets(&self) -> Vec<PlanTarget> {
        let mut targets: Vec<PlanTarget> = self
            .indexes
            .iter()
            .filter(|e| e.options.searchable)
            .map(|e| {
                PlanTarget::new(
                    e.key().clone(),
                    e.options.vector && e.client.supports_vector(),
                )
            })
            .collect();
        targets.sort_by(|a, b| a.index.cmp(&b.index));
        targets
    }

    /// Register the factory for a backend kind, replacing any previous one.
    pub fn register_factory(&self, factory: Arc<dyn IndexFactory>) {
        self.factories.insert(factory.backend(), factory);
    }

    /// Build and register a client for every configured index.
    pub async fn load(
        &self,
        config: &Config,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        policy: &RetryPolicy,
    ) -> Result<(), SearchError> {
        for index in &config.indexes {
            let factory = self
                .factories
                .get(&index.backend)
                .map(|f| f.value().clone())
                .ok_or_else(|| {
                    SearchError::Configuration(format!(
                        "no factory registered for backend '{}' (index '{}')",
                        index.backend, index.id
                    ))
                })?;

            let client = factory.create(index, config, embedder.clone()).await?;
            if client.id() != index.id {
                return Err(SearchError::Configuration(format!(
                    "factory for '{}' returned a client named '{}'",
                    index.id,
                    client.id()
                )));
            }

            let client: Arc<dyn IndexClient> =
                Arc::new(RetryingIndexClient::new(client, policy.clone()));
            self.register(
                client,
                IndexOptions {
                    searchable: index.searchable,
                    vector: index.vector,
                },
            )?;
            info!(
                index = %index.id,
                backend = %index.backend,
                searchable = index.searchable,
                "Registered index"
            );
        }
        Ok(())
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
