//! Search engine facade.
//!
//! Validates a request, consults the cache, then runs
//! plan → execute → fuse → process and assembles the response.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use smartsource_config::{CacheConfig, Config, ConfigValidator, SearchConfig};
use smartsource_protocols::{
    Embedding, EmbeddingError, EmbeddingProvider, SearchError, SearchRequest, SearchResponse,
};

use crate::cache::{CacheComputeError, CacheKey, QueryCache};
use crate::executor::SearchExecutor;
use crate::fusion::RankFusion;
use crate::planner::QueryPlanner;
use crate::processor::ResultProcessor;
use crate::query::SearchQuery;
use crate::registry::IndexRegistry;
use crate::retry::{RetryPolicy, RetryingEmbedder};

/// Source id reported when the query embedding could not be produced.
pub const EMBEDDING_SOURCE: &str = "embedding";

/// Settings the engine needs at query time.
#[derive(Debug, Clone, Default)]
pub struct SearchSettings {
    pub search: SearchConfig,
    pub cache: CacheConfig,
}

impl From<&Config> for SearchSettings {
    fn from(config: &Config) -> Self {
        Self {
            search: config.search.clone(),
            cache: config.cache.clone(),
        }
    }
}

/// Hybrid search engine.
pub struct SearchEngine {
    registry: Arc<IndexRegistry>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    settings: SearchSettings,
    executor: SearchExecutor,
    fusion: RankFusion,
    processor: ResultProcessor,
    cache: Option<QueryCache>,
}

impl SearchEngine {
    /// Create an engine over already registered indexes. A cache is built
    /// from `settings.cache` when it is enabled.
    pub fn new(
        registry: Arc<IndexRegistry>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        settings: SearchSettings,
    ) -> Self {
        let cache = settings
            .cache
            .enabled
            .then(|| QueryCache::from_config(&settings.cache));
        let executor = SearchExecutor::new(registry.clone(), settings.search.per_source_timeout());

        Self {
            executor,
            fusion: RankFusion::new(settings.search.rrf_k),
            processor: ResultProcessor::new(&settings.search),
            registry,
            embedder,
            settings,
            cache,
        }
    }

    /// Replace the cache, or disable caching with `None`.
    pub fn with_cache(mut self, cache: Option<QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Validate the configuration and build every configured index through
    /// the factories registered on `registry`.
    pub async fn from_config(
        config: &Config,
        registry: IndexRegistry,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self, SearchError> {
        let validation = ConfigValidator::validate(config)
            .map_err(|e| SearchError::Configuration(e.to_string()))?;
        for warning in &validation.warnings {
            warn!(path = %warning.path, "Config warning: {}", warning.message);
        }
        if !validation.is_valid() {
            let errors = validation
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.path, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SearchError::Configuration(errors));
        }

        let policy = RetryPolicy::from(&config.retry);
        let embedder = embedder.map(|inner| {
            Arc::new(RetryingEmbedder::new(inner, policy.clone())) as Arc<dyn EmbeddingProvider>
        });

        registry.load(config, embedder.clone(), &policy).await?;
        info!(
            indexes = registry.len(),
            embedder = embedder.is_some(),
            cache = config.cache.enabled,
            "Search engine ready"
        );

        Ok(Self::new(
            Arc::new(registry),
            embedder,
            SearchSettings::from(config),
        ))
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    /// Drop every cached response.
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// Answer one search request.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let span = info_span!("search", query_id = %Uuid::new_v4());
        self.search_cached(request).instrument(span).await
    }

    async fn search_cached(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let query = SearchQuery::from_request(&request, &self.settings.search)?;

        let Some(cache) = &self.cache else {
            return self.run(&query).await;
        };

        let key = CacheKey::for_query(&query)?;
        let response = cache
            .get_or_compute(key, self.run(&query))
            .await
            .map_err(CacheComputeError::into_inner)?;
        Ok(SearchResponse::clone(&response))
    }

    async fn run(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let deadline = self.settings.search.deadline();

        let planner = QueryPlanner::new(self.registry.targets(), &self.settings.search);
        let class = planner.classify(query);

        let mut sources_failed = Vec::new();
        let embedding = if class.wants_vectors() && planner.has_vector_targets() {
            match self.embed(query.text(), deadline).await {
                Ok(embedding) => embedding,
                Err(error) => {
                    warn!(
                        service_failure = error.is_service_failure(),
                        "Embedding failed, falling back to keyword search: {}",
                        error
                    );
                    if error.is_service_failure() {
                        sources_failed.push(EMBEDDING_SOURCE.to_string());
                    }
                    None
                }
            }
        } else {
            None
        };

        let plan = planner.plan(query, embedding)?;
        if let Some(reason) = &plan.vector_fallback {
            debug!(reason = %reason, "Vector steps dropped");
        }

        let remaining = deadline.saturating_sub(started.elapsed());
        let outcome = self.executor.execute(&plan, remaining).await?;
        sources_failed.extend(outcome.failed_sources());

        let candidates = self.fusion.fuse(&outcome.hits);
        let page = self.processor.process(candidates, query.page());

        let response = SearchResponse {
            results: page.documents,
            total_considered: page.total_considered,
            degraded: !sources_failed.is_empty(),
            sources_failed,
        };

        info!(
            mode = %plan.mode,
            steps = plan.steps.len(),
            results = response.results.len(),
            total_considered = response.total_considered,
            degraded = response.degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(response)
    }

    /// Embed the query text within the per-source budget.
    async fn embed(
        &self,
        text: &str,
        deadline: Duration,
    ) -> Result<Option<Arc<Embedding>>, EmbeddingError> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };

        let budget = self.settings.search.per_source_timeout().min(deadline);
        match timeout(budget, embedder.embed(text)).await {
            Ok(result) => result.map(|embedding| Some(Arc::new(embedding))),
            Err(_) => Err(EmbeddingError::Unavailable(format!(
                "embedding timed out after {} ms",
                budget.as_millis()
            ))),
        }
    }

    /// Spawn a task that sweeps expired cache entries every `interval`
    /// until `token` is cancelled. Returns `None` when caching is disabled
    /// or `interval` is zero.
    pub fn start_cache_sweeper(
        &self,
        interval: Duration,
        token: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let cache = self.cache.clone()?;
        if interval.is_zero() {
            warn!("Cache sweep interval is zero, sweeper not started");
            return None;
        }
        let span = info_span!("cache_sweeper", interval_ms = interval.as_millis() as u64);

        let sweeper = async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        cache.sweep().await;
                        debug!(entries = cache.entry_count(), "Cache swept");
                    }
                }
            }
        };

        Some(tokio::spawn(sweeper.instrument(span)))
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
