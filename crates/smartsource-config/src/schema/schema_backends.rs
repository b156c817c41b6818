//! Backend configuration: indexes, Elasticsearch connection, embeddings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::default_true;

/// Embedding service selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI embeddings API.
    OpenAI,
    /// Azure OpenAI deployment.
    Azure,
    /// Deterministic local hashing (not semantic).
    Hash,
    /// No embedder: vector mode is disabled.
    #[default]
    None,
}

/// Embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL (Azure: the resource endpoint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Azure deployment name (defaults to the model name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Expected vector length.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            api_key: None,
            base_url: None,
            model: default_embedding_model(),
            deployment: None,
            api_version: default_api_version(),
            dimension: default_dimension(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

/// Shared Elasticsearch connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Cluster URL, including the port.
    #[serde(default = "default_es_host")]
    pub host: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_es_timeout_secs")]
    pub timeout_secs: u64,

    /// Fields searched by keyword queries (boosts allowed, e.g. `title^2`).
    #[serde(default = "default_text_fields")]
    pub text_fields: Vec<String>,

    /// Dense vector field used by kNN queries.
    #[serde(default = "default_vector_field")]
    pub vector_field: String,
}

impl ElasticsearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            host: default_es_host(),
            user: None,
            password: None,
            api_key: None,
            timeout_secs: default_es_timeout_secs(),
            text_fields: default_text_fields(),
            vector_field: default_vector_field(),
        }
    }
}

fn default_es_host() -> String {
    "http://localhost:9200".to_string()
}

fn default_es_timeout_secs() -> u64 {
    30
}

fn default_text_fields() -> Vec<String> {
    vec!["title^2".to_string(), "content".to_string()]
}

fn default_vector_field() -> String {
    "embedding".to_string()
}

/// Index backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Elasticsearch,
    Memory,
}

impl std::fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexBackend::Elasticsearch => write!(f, "elasticsearch"),
            IndexBackend::Memory => write!(f, "memory"),
        }
    }
}

/// A configured content index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Identifier used in attributions and source ids.
    pub id: String,

    pub backend: IndexBackend,

    /// Only searchable indexes are targeted by the planner.
    #[serde(default = "default_true")]
    pub searchable: bool,

    /// Whether the index answers vector queries.
    #[serde(default = "default_true")]
    pub vector: bool,

    /// Backend index name, when it differs from `id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// JSON document file for the memory backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<PathBuf>,
}

impl IndexConfig {
    pub fn new(id: impl Into<String>, backend: IndexBackend) -> Self {
        Self {
            id: id.into(),
            backend,
            searchable: true,
            vector: true,
            name: None,
            documents: None,
        }
    }

    /// Name of the index on the backend.
    pub fn remote_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
