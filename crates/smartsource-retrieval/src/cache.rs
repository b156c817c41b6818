//! Query result cache.
//!
//! Built on `moka::future::Cache`: per-key initialization is coalesced, so
//! concurrent identical queries trigger a single pipeline run and every
//! waiter receives the same response or the same shared error.

use std::fmt;
use std::future::Future;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use moka::Expiry;
use thiserror::Error;
use tracing::debug;

use smartsource_config::CacheConfig;
use smartsource_protocols::{SearchError, SearchResponse};

use crate::expansion::expand;
use crate::query::SearchQuery;

/// blake3 digest of the query tokens and verbatim phrases, filters, page
/// and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn for_query(query: &SearchQuery) -> Result<Self, SearchError> {
        let expanded = expand(query.text());
        let mut hasher = blake3::Hasher::new();
        hasher.update(expanded.tokens.join(" ").as_bytes());
        hasher.update(&[0]);
        // Phrases are sent case-preserved, so they key case-preserved.
        hasher.update(expanded.phrases.join("\"").as_bytes());
        hasher.update(&[0]);
        serde_json::to_writer(&mut hasher, query.filters())
            .map_err(|e| SearchError::InvalidQuery(format!("unhashable filters: {}", e)))?;
        hasher.update(&[0]);
        let page = query.page();
        write!(
            hasher,
            "{}:{}:{}",
            page.offset,
            page.limit,
            query.mode().map(|m| m.to_string()).unwrap_or_default()
        )
        .map_err(|e| SearchError::InvalidQuery(e.to_string()))?;
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A cached response with its own lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: Arc<SearchResponse>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Error shared by every waiter of one failed computation.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CacheComputeError(pub Arc<SearchError>);

impl CacheComputeError {
    pub fn shared(&self) -> &Arc<SearchError> {
        &self.0
    }

    pub fn into_inner(self) -> SearchError {
        Arc::unwrap_or_clone(self.0)
    }
}

struct EntryExpiry;

impl Expiry<CacheKey, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded LRU cache of search responses.
#[derive(Clone)]
pub struct QueryCache {
    inner: Cache<CacheKey, CacheEntry>,
    ttl: Duration,
    degraded_ttl: Duration,
}

impl QueryCache {
    pub fn new(max_entries: u64, ttl: Duration, degraded_ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryExpiry)
            .build();
        Self {
            inner,
            ttl,
            degraded_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl(), config.degraded_ttl())
    }

    /// Lifetime for a response: degraded responses expire sooner.
    pub fn ttl_for(&self, response: &SearchResponse) -> Duration {
        if response.degraded {
            self.degraded_ttl
        } else {
            self.ttl
        }
    }

    /// Look up a live entry.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<SearchResponse>> {
        let entry = self.inner.get(key).await?;
        if entry.is_expired() {
            self.inner.invalidate(key).await;
            return None;
        }
        Some(entry.response)
    }

    /// Store a response directly.
    pub async fn insert(&self, key: CacheKey, response: SearchResponse) {
        let entry = CacheEntry {
            ttl: self.ttl_for(&response),
            response: Arc::new(response),
            created_at: Instant::now(),
        };
        self.inner.insert(key, entry).await;
    }

    /// Return the cached response for `key`, or run `compute` once for all
    /// concurrent callers and cache its success.
    pub async fn get_or_compute<F>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<Arc<SearchResponse>, CacheComputeError>
    where
        F: Future<Output = Result<SearchResponse, SearchError>>,
    {
        if let Some(response) = self.get(&key).await {
            debug!(key = %key, "Cache hit");
            return Ok(response);
        }

        let computed = AtomicBool::new(false);
        let init = async {
            computed.store(true, Ordering::SeqCst);
            let response = compute.await?;
            Ok::<_, SearchError>(CacheEntry {
                ttl: self.ttl_for(&response),
                response: Arc::new(response),
                created_at: Instant::now(),
            })
        };

        let entry = self
            .inner
            .try_get_with(key, init)
            .await
            .map_err(CacheComputeError)?;
        debug!(
            key = %key,
            computed = computed.load(Ordering::SeqCst),
            ttl_ms = entry.ttl.as_millis() as u64,
            "Cache miss"
        );
        Ok(entry.response)
    }

    /// Run pending expiry and eviction work.
    pub async fn sweep(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
