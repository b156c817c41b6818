//! Retry wrappers for index clients and embedders.
//!
//! Only transient failures are retried: connection errors, backend
//! 429/502/503/504 and an unavailable embedding service. Timeouts and
//! malformed queries surface immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use smartsource_protocols::{
    Embedding, EmbeddingError, EmbeddingProvider, IndexClient, IndexError, KeywordRequest, RawHit,
    VectorRequest,
};

/// Retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&smartsource_config::RetryConfig::default())
    }
}

impl From<&smartsource_config::RetryConfig> for RetryPolicy {
    fn from(config: &smartsource_config::RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            let jitter = rand_jitter(delay * 0.1);
            (delay + jitter).max(0.0) as u64
        } else {
            delay as u64
        };

        Duration::from_millis(delay_ms)
    }

    /// Run `operation` until it succeeds, fails permanently, or the
    /// attempts run out.
    pub async fn run<F, Fut, T, E>(
        &self,
        what: &str,
        retryable: impl Fn(&E) -> bool,
        operation: F,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !retryable(&e) || attempt >= self.max_retries {
                        return Err(e);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        what,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Simple jitter using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) * max * 2.0 - max
}

/// Index client wrapper that retries transient failures.
pub struct RetryingIndexClient {
    inner: Arc<dyn IndexClient>,
    policy: RetryPolicy,
}

impl RetryingIndexClient {
    pub fn new(inner: Arc<dyn IndexClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &Arc<dyn IndexClient> {
        &self.inner
    }
}

#[async_trait]
impl IndexClient for RetryingIndexClient {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn supports_vector(&self) -> bool {
        self.inner.supports_vector()
    }

    async fn keyword_search(&self, request: &KeywordRequest) -> Result<Vec<RawHit>, IndexError> {
        let what = format!("{} keyword search", self.inner.id());
        self.policy
            .run(&what, IndexError::is_transient, || {
                self.inner.keyword_search(request)
            })
            .await
    }

    async fn vector_search(&self, request: &VectorRequest) -> Result<Vec<RawHit>, IndexError> {
        let what = format!("{} vector search", self.inner.id());
        self.policy
            .run(&what, IndexError::is_transient, || {
                self.inner.vector_search(request)
            })
            .await
    }
}

/// Embedding provider wrapper that retries an unavailable service.
pub struct RetryingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.policy
            .run(
                "Embedding",
                |e: &EmbeddingError| matches!(e, EmbeddingError::Unavailable(_)),
                || self.inner.embed(text),
            )
            .await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
