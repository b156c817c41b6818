use super::*;
use smartsource_protocols::SearchMode;
use std::sync::atomic::{AtomicU32, Ordering};

struct FlakyIndex {
    calls: AtomicU32,
    fail_times: u32,
    error: IndexError,
}

impl FlakyIndex {
    fn new(fail_times: u32, error: IndexError) -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_times,
            error,
        }
    }
}

#[async_trait]
impl IndexClient for FlakyIndex {
    fn id(&self) -> &str {
        "flaky"
    }

    fn supports_vector(&self) -> bool {
        false
    }

    async fn keyword_search(&self, _: &KeywordRequest) -> Result<Vec<RawHit>, IndexError> {
        let count = self.calls.fetch_add(1, Ordering::SeqCst);
        if count < self.fail_times {
            Err(self.error.clone())
        } else {
            Ok(vec![RawHit::new("doc-1", "flaky", SearchMode::Keyword, 1.0, 1)])
        }
    }

    async fn vector_search(&self, _: &VectorRequest) -> Result<Vec<RawHit>, IndexError> {
        Err(self.error.clone())
    }
}

struct FlakyEmbedder {
    calls: AtomicU32,
    error: EmbeddingError,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, _: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn dimension(&self) -> usize {
        3
    }
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        jitter: false,
        ..Default::default()
    }
}

#[test]
fn test_policy_from_config() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.base_delay, Duration::from_millis(100));
    assert_eq!(policy.max_delay, Duration::from_secs(2));
}

#[test]
fn test_delay_calculation() {
    let policy = RetryPolicy {
        base_delay: Duration::from_millis(100),
        jitter: false,
        ..Default::default()
    };

    assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
    assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(2));
}

#[test]
fn test_delay_jitter_stays_bounded() {
    let policy = RetryPolicy::default();
    for attempt in 0..5 {
        let delay = policy.delay_for_attempt(attempt);
        assert!(delay <= Duration::from_millis(2200));
    }
}

#[tokio::test]
async fn test_retries_transient_until_success() {
    let index = Arc::new(FlakyIndex::new(2, IndexError::Connection("reset".to_string())));
    let client = RetryingIndexClient::new(index.clone(), fast_policy(3));

    let hits = client.keyword_search(&KeywordRequest::default()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(index.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let index = Arc::new(FlakyIndex::new(
        10,
        IndexError::Backend {
            status: 503,
            message: "unavailable".to_string(),
        },
    ));
    let client = RetryingIndexClient::new(index.clone(), fast_policy(2));

    let result = client.keyword_search(&KeywordRequest::default()).await;
    assert!(matches!(result, Err(IndexError::Backend { status: 503, .. })));
    assert_eq!(index.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_malformed_query_not_retried() {
    let index = Arc::new(FlakyIndex::new(
        10,
        IndexError::MalformedQuery("bad".to_string()),
    ));
    let client = RetryingIndexClient::new(index.clone(), fast_policy(3));

    let result = client.keyword_search(&KeywordRequest::default()).await;
    assert!(matches!(result, Err(IndexError::MalformedQuery(_))));
    assert_eq!(index.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_wrapper_preserves_identity() {
    let index = Arc::new(FlakyIndex::new(0, IndexError::Timeout(1)));
    let client = RetryingIndexClient::new(index, RetryPolicy::none());
    assert_eq!(client.id(), "flaky");
    assert!(!client.supports_vector());
    assert_eq!(client.inner().id(), "flaky");
}

#[tokio::test]
async fn test_embedder_retries_unavailable_only() {
    let embedder = Arc::new(FlakyEmbedder {
        calls: AtomicU32::new(0),
        error: EmbeddingError::Unavailable("down".to_string()),
    });
    let retrying = RetryingEmbedder::new(embedder.clone(), fast_policy(2));
    assert!(retrying.embed("text").await.is_err());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    assert_eq!(retrying.dimension(), 3);

    let embedder = Arc::new(FlakyEmbedder {
        calls: AtomicU32::new(0),
        error: EmbeddingError::InvalidInput("empty".to_string()),
    });
    let retrying = RetryingEmbedder::new(embedder.clone(), fast_policy(2));
    assert!(retrying.embed("text").await.is_err());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}
