//! # SmartSource Retrieval
//!
//! Hybrid retrieval pipeline: query planning, parallel fan-out across index
//! clients, reciprocal rank fusion, result processing and a single-flight
//! query cache.
//!
//! ## Pipeline
//!
//! - [`QueryPlanner`] - Classifies a query and builds the dispatch plan
//! - [`SearchExecutor`] - Runs every (index, mode) step concurrently
//! - [`RankFusion`] - Merges per-source ranked lists with RRF
//! - [`ResultProcessor`] - Recency adjustment, excerpts and attribution
//! - [`QueryCache`] - Coalesced, TTL-bounded response cache
//! - [`SearchEngine`] - Facade wiring the stages together

pub mod cache;
pub mod engine;
pub mod executor;
pub mod expansion;
pub mod fusion;
pub mod planner;
pub mod processor;
pub mod query;
pub mod registry;
pub mod retry;

#[cfg(test)]
mod test_support;

pub use cache::{CacheComputeError, CacheEntry, CacheKey, QueryCache};
pub use engine::{SearchEngine, SearchSettings};
pub use executor::{ExecutionOutcome, SearchExecutor, SourceHits};
pub use expansion::{expand, ExpandedQuery};
pub use fusion::{FusedCandidate, RankFusion};
pub use planner::{
    ClassReason, DispatchPlan, DispatchStep, PlanTarget, QueryClass, QueryPlanner, StepRequest,
};
pub use processor::{ProcessedPage, ResultProcessor};
pub use query::{validate_page, Page, SearchQuery};
pub use registry::{IndexFactory, IndexOptions, IndexRegistry};
pub use retry::{RetryPolicy, RetryingEmbedder, RetryingIndexClient};
