//! Brute-force in-memory index.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use smartsource_protocols::{
    Embedding, EmbeddingProvider, HitMetadata, IndexClient, IndexError, KeywordRequest, RawHit,
    SearchMode, VectorRequest,
};

use crate::document::{load_documents, matches_filters, DocumentLoadError, MemoryDocument};

/// Extra score for every matched phrase.
const PHRASE_BONUS: f32 = 2.0;
/// Title occurrences count this many times.
const TITLE_WEIGHT: f32 = 2.0;

struct StoredDocument {
    id: String,
    title_tokens: Vec<String>,
    content_tokens: Vec<String>,
    haystack: String,
    metadata: HitMetadata,
    embedding: Option<Embedding>,
}

/// Index held entirely in memory.
pub struct MemoryIndex {
    id: String,
    documents: RwLock<Vec<StoredDocument>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl MemoryIndex {
    /// Create an empty index. Vector search is available when an embedder
    /// is supplied.
    pub fn new(id: impl Into<String>, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            id: id.into(),
            documents: RwLock::new(Vec::new()),
            embedder,
        }
    }

    /// Create an index from a JSON document file.
    pub async fn load(
        id: impl Into<String>,
        path: &Path,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self, DocumentLoadError> {
        let index = Self::new(id, embedder);
        let documents = load_documents(path).await?;
        let count = documents.len();
        index.add_documents(documents).await;
        info!(index = %index.id, documents = count, path = %path.display(), "Loaded memory index");
        Ok(index)
    }

    /// Add documents, embedding each one when an embedder is configured.
    /// Documents whose embedding fails stay keyword-searchable.
    pub async fn add_documents(&self, documents: Vec<MemoryDocument>) {
        let mut stored = Vec::with_capacity(documents.len());
        for doc in documents {
            let embedding = match &self.embedder {
                Some(embedder) => match embedder.embed(&doc.embedding_text()).await {
                    Ok(embedding) => Some(embedding),
                    Err(e) => {
                        warn!(index = %self.id, doc = %doc.id, "Embedding failed: {}", e);
                        None
                    }
                },
                None => None,
            };
            stored.push(StoredDocument {
                id: doc.id.clone(),
                title_tokens: tokenize(&doc.title),
                content_tokens: tokenize(&doc.content),
                haystack: normalize(&format!("{} {}", doc.title, doc.content)),
                metadata: doc.to_metadata(),
                embedding,
            });
        }

        let mut documents = self.documents.write();
        for doc in stored {
            match documents.iter().position(|d| d.id == doc.id) {
                Some(i) => documents[i] = doc,
                None => documents.push(doc),
            }
        }
    }

    /// Get the number of documents in the index.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

/// Lowercase words with surrounding punctuation trimmed.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Tokens joined by single spaces, for phrase matching.
fn normalize(text: &str) -> String {
    format!(" {} ", tokenize(text).join(" "))
}

fn keyword_score(doc: &StoredDocument, request: &KeywordRequest) -> f32 {
    let mut score = 0.0;
    for phrase in &request.phrases {
        let needle = normalize(phrase);
        if needle.trim().is_empty() {
            continue;
        }
        if !doc.haystack.contains(&needle) {
            return 0.0;
        }
        score += PHRASE_BONUS;
    }

    for term in &request.terms {
        let term = term.to_lowercase();
        let in_title = doc.title_tokens.iter().filter(|t| **t == term).count() as f32;
        let in_content = doc.content_tokens.iter().filter(|t| **t == term).count() as f32;
        score += in_title * TITLE_WEIGHT + in_content;
    }
    score
}

fn by_score_then_id(a: &(f32, &StoredDocument), b: &(f32, &StoredDocument)) -> Ordering {
    b.0.partial_cmp(&a.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.id.cmp(&b.1.id))
}

impl MemoryIndex {
    fn hits(
        &self,
        mut scored: Vec<(f32, &StoredDocument)>,
        limit: usize,
        mode: SearchMode,
    ) -> Vec<RawHit> {
        scored.sort_by(by_score_then_id);
        scored.truncate(limit);
        scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, doc))| {
                RawHit::new(doc.id.clone(), self.id.clone(), mode, score, i + 1)
                    .with_metadata(doc.metadata.clone())
            })
            .collect()
    }
}

#[async_trait]
impl IndexClient for MemoryIndex {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_vector(&self) -> bool {
        self.embedder.is_some()
    }

    async fn keyword_search(&self, request: &KeywordRequest) -> Result<Vec<RawHit>, IndexError> {
        if request.terms.is_empty() && request.phrases.is_empty() {
            return Err(IndexError::MalformedQuery(
                "keyword query has no terms".to_string(),
            ));
        }

        let documents = self.documents.read();
        let scored: Vec<(f32, &StoredDocument)> = documents
            .iter()
            .filter(|doc| matches_filters(&doc.metadata, &request.filters))
            .map(|doc| (keyword_score(doc, request), doc))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        let hits = self.hits(scored, request.limit, SearchMode::Keyword);
        debug!(index = %self.id, hits = hits.len(), "Keyword search");
        Ok(hits)
    }

    async fn vector_search(&self, request: &VectorRequest) -> Result<Vec<RawHit>, IndexError> {
        let query = request.embedding.as_ref();
        let documents = self.documents.read();

        if let Some(stored) = documents.iter().find_map(|d| d.embedding.as_ref()) {
            if stored.dimension != query.dimension {
                return Err(IndexError::MalformedQuery(format!(
                    "query vector has {} dimensions, index '{}' has {}",
                    query.dimension, self.id, stored.dimension
                )));
            }
        }

        let scored: Vec<(f32, &StoredDocument)> = documents
            .iter()
            .filter(|doc| matches_filters(&doc.metadata, &request.filters))
            .filter_map(|doc| {
                doc.embedding
                    .as_ref()
                    .map(|e| (query.cosine_similarity(e), doc))
            })
            .collect();

        let hits = self.hits(scored, request.limit, SearchMode::Vector);
        debug!(index = %self.id, hits = hits.len(), "Vector search");
        Ok(hits)
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
