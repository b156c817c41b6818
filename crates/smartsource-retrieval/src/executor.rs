//! Parallel search executor.
//!
//! Every step of a plan runs concurrently inside one `FuturesUnordered`.
//! Nothing is spawned: dropping the set on deadline expiry cancels the
//! calls that are still outstanding.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use smartsource_protocols::{IndexClient, IndexError, RawHit, SearchError, SourceFailure};

use crate::planner::{DispatchPlan, DispatchStep, StepRequest};
use crate::registry::IndexRegistry;

/// Hit lists keyed by source id (`"{index}:{mode}"`).
pub type SourceHits = BTreeMap<String, Vec<RawHit>>;

/// What came back from one fan-out.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub hits: SourceHits,
    pub failures: Vec<SourceFailure>,
}

impl ExecutionOutcome {
    pub fn failed_sources(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.source_id.clone()).collect()
    }
}

/// Runs dispatch plans against the registered index clients.
pub struct SearchExecutor {
    registry: Arc<IndexRegistry>,
    per_source_timeout: Duration,
}

impl SearchExecutor {
    pub fn new(registry: Arc<IndexRegistry>, per_source_timeout: Duration) -> Self {
        Self {
            registry,
            per_source_timeout,
        }
    }

    /// Execute every step concurrently and wait for all of them, or for
    /// `deadline`, whichever comes first.
    pub async fn execute(
        &self,
        plan: &DispatchPlan,
        deadline: Duration,
    ) -> Result<ExecutionOutcome, SearchError> {
        let started = Instant::now();
        let deadline_at = started + deadline;
        let budget = self.per_source_timeout.min(deadline);

        let mut pending: FuturesUnordered<_> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(position, step)| {
                let client = self.registry.client(&step.index);
                async move {
                    debug!(source = %step.source_id(), "Dispatching source");
                    let result = match client {
                        Some(client) => run_step(client.as_ref(), step, budget).await,
                        None => Err(IndexError::Connection(format!(
                            "no client registered for index '{}'",
                            step.index
                        ))),
                    };
                    (position, result)
                }
            })
            .collect();

        let mut results: Vec<Option<Result<Vec<RawHit>, IndexError>>> =
            vec![None; plan.steps.len()];

        loop {
            match timeout_at(deadline_at, pending.next()).await {
                Ok(Some((position, result))) => results[position] = Some(result),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        outstanding = pending.len(),
                        deadline_ms = deadline.as_millis() as u64,
                        "Search deadline reached, cancelling outstanding sources"
                    );
                    break;
                }
            }
        }
        drop(pending);

        let mut outcome = ExecutionOutcome::default();
        for (step, result) in plan.steps.iter().zip(results) {
            let result = result.unwrap_or_else(|| {
                Err(IndexError::Timeout(started.elapsed().as_millis() as u64))
            });
            match result {
                Ok(mut hits) => {
                    renumber(step, &mut hits);
                    debug!(source = %step.source_id(), hits = hits.len(), "Source completed");
                    outcome.hits.insert(step.source_id(), hits);
                }
                Err(error) => {
                    let failure = SourceFailure::new(step.index.clone(), step.mode(), error);
                    warn!(
                        source = %failure.source_id,
                        kind = failure.error.kind(),
                        "Source failed: {}",
                        failure.error
                    );
                    outcome.failures.push(failure);
                }
            }
        }

        if outcome.hits.is_empty() && !outcome.failures.is_empty() {
            return Err(SearchError::AllSourcesFailed {
                failures: outcome.failures,
            });
        }

        Ok(outcome)
    }
}

async fn run_step(
    client: &dyn IndexClient,
    step: &DispatchStep,
    budget: Duration,
) -> Result<Vec<RawHit>, IndexError> {
    let call = async {
        match &step.request {
            StepRequest::Keyword(request) => client.keyword_search(request).await,
            StepRequest::Vector(request) => client.vector_search(request).await,
        }
    };

    match timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(IndexError::Timeout(budget.as_millis() as u64)),
    }
}

/// Keep the source's order, cap it at the plan limit, and number it 1..n.
fn renumber(step: &DispatchStep, hits: &mut Vec<RawHit>) {
    let limit = match &step.request {
        StepRequest::Keyword(request) => request.limit,
        StepRequest::Vector(request) => request.limit,
    };
    hits.truncate(limit);
    for (position, hit) in hits.iter_mut().enumerate() {
        hit.rank = position + 1;
        hit.index = step.index.clone();
        hit.mode = step.mode();
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
