//! Index backend protocol definitions.
//!
//! An index client wraps exactly one backend index and exposes the two
//! retrieval strategies the engine fans out over.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::IndexError;
use crate::query::Filters;

/// Raw metadata attached to a hit, as returned by the backend.
pub type HitMetadata = serde_json::Map<String, serde_json::Value>;

/// Retrieval strategy used for one source list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Keyword,
    Vector,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Keyword => "keyword",
            SearchMode::Vector => "vector",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyword" => Ok(SearchMode::Keyword),
            "vector" => Ok(SearchMode::Vector),
            other => Err(format!("unknown search mode '{}'", other)),
        }
    }
}

/// A single scored hit from one index and one search mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHit {
    /// Document identifier, unique within the deployment.
    pub doc_id: String,
    /// Index that produced the hit.
    pub index: String,
    /// Strategy that produced the hit.
    pub mode: SearchMode,
    /// Backend relevance score (not comparable across sources).
    pub score: f32,
    /// 1-indexed position within the source list.
    pub rank: usize,
    /// Raw metadata blob.
    #[serde(default)]
    pub metadata: HitMetadata,
}

impl RawHit {
    pub fn new(
        doc_id: impl Into<String>,
        index: impl Into<String>,
        mode: SearchMode,
        score: f32,
        rank: usize,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            index: index.into(),
            mode,
            score,
            rank,
            metadata: HitMetadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HitMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Lexical query parameters.
#[derive(Debug, Clone, Default)]
pub struct KeywordRequest {
    /// Normalized single-word terms.
    pub terms: Vec<String>,
    /// Phrases that must match verbatim.
    pub phrases: Vec<String>,
    pub filters: Filters,
    pub limit: usize,
}

/// Semantic query parameters.
#[derive(Debug, Clone)]
pub struct VectorRequest {
    /// Query embedding, shared across every vector step of a plan.
    pub embedding: Arc<Embedding>,
    pub filters: Filters,
    pub limit: usize,
}

/// Uniform interface over a single backend index.
///
/// Implementations return hits in their own relevance order; the executor
/// assigns ranks by position. Failures must use the [`IndexError`] variants
/// so that timeouts, malformed queries and backend faults stay distinct.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Returns the index identifier.
    fn id(&self) -> &str;

    /// Whether this index can answer vector queries.
    fn supports_vector(&self) -> bool {
        true
    }

    /// Run a lexical query.
    async fn keyword_search(&self, request: &KeywordRequest) -> Result<Vec<RawHit>, IndexError>;

    /// Run a semantic query.
    async fn vector_search(&self, request: &VectorRequest) -> Result<Vec<RawHit>, IndexError>;
}
