//! Hand-written mocks shared by the unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use smartsource_protocols::{
    HitMetadata, IndexClient, IndexError, KeywordRequest, RawHit, SearchMode, VectorRequest,
};

pub(crate) type Canned = Result<Vec<String>, IndexError>;

/// Index that answers with fixed document ids after an optional delay.
pub(crate) struct MockIndex {
    id: String,
    vector: bool,
    keyword: Canned,
    vector_hits: Canned,
    delay: Duration,
    pub keyword_calls: AtomicU32,
    pub vector_calls: AtomicU32,
}

impl MockIndex {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            vector: true,
            keyword: Ok(Vec::new()),
            vector_hits: Ok(Vec::new()),
            delay: Duration::ZERO,
            keyword_calls: AtomicU32::new(0),
            vector_calls: AtomicU32::new(0),
        }
    }

    pub fn keyword(mut self, docs: &[&str]) -> Self {
        self.keyword = Ok(docs.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn vector(mut self, docs: &[&str]) -> Self {
        self.vector_hits = Ok(docs.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn keyword_error(mut self, error: IndexError) -> Self {
        self.keyword = Err(error);
        self
    }

    pub fn vector_error(mut self, error: IndexError) -> Self {
        self.vector_hits = Err(error);
        self
    }

    pub fn keyword_only(mut self) -> Self {
        self.vector = false;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn answer(&self, canned: &Canned, mode: SearchMode) -> Result<Vec<RawHit>, IndexError> {
        let docs = canned.clone()?;
        Ok(docs
            .iter()
            .enumerate()
            // Ranks from the backend are deliberately off by ten.
            .map(|(i, doc)| {
                RawHit::new(doc.clone(), self.id.clone(), mode, 1.0 / (i as f32 + 1.0), i + 10)
                    .with_metadata(metadata(doc))
            })
            .collect())
    }
}

pub(crate) fn metadata(doc: &str) -> HitMetadata {
    let mut metadata = HitMetadata::new();
    metadata.insert("title".to_string(), json!(format!("Title {}", doc)));
    metadata.insert("content".to_string(), json!(format!("Content of {}", doc)));
    metadata
}

#[async_trait]
impl IndexClient for MockIndex {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_vector(&self) -> bool {
        self.vector
    }

    async fn keyword_search(&self, _: &KeywordRequest) -> Result<Vec<RawHit>, IndexError> {
        self.keyword_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer(&self.keyword, SearchMode::Keyword)
    }

    async fn vector_search(&self, _: &VectorRequest) -> Result<Vec<RawHit>, IndexError> {
        self.vector_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer(&self.vector_hits, SearchMode::Vector)
    }
}
