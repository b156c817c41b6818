//! Query planner.
//!
//! Classifies a validated query and turns it into an ordered set of
//! (index, mode) dispatch steps. Pure computation: the embedding, when one
//! is needed, is produced by the caller and handed in.

use std::sync::Arc;

use tracing::debug;

use smartsource_config::SearchConfig;
use smartsource_protocols::{
    Embedding, KeywordRequest, QueryMode, SearchError, SearchMode, VectorRequest,
};

use crate::expansion::{expand, ExpandedQuery};
use crate::query::SearchQuery;

/// Words that signal a conceptual question.
pub const INTENT_KEYWORDS: &[&str] = &[
    "compare",
    "describe",
    "difference",
    "explain",
    "how",
    "overview",
    "summarize",
    "what",
    "why",
];

/// An index the planner may dispatch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTarget {
    pub index: String,
    pub supports_vector: bool,
}

impl PlanTarget {
    pub fn new(index: impl Into<String>, supports_vector: bool) -> Self {
        Self {
            index: index.into(),
            supports_vector,
        }
    }
}

/// Why a query was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassReason {
    Override,
    ShortQuery,
    Phrase,
    Intent,
    LongQuery,
}

/// Classification of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryClass {
    pub mode: QueryMode,
    pub reason: ClassReason,
    pub expanded: ExpandedQuery,
}

impl QueryClass {
    pub fn wants_vectors(&self) -> bool {
        self.mode != QueryMode::Keyword
    }
}

/// Mode-specific parameters for one step.
#[derive(Debug, Clone)]
pub enum StepRequest {
    Keyword(KeywordRequest),
    Vector(VectorRequest),
}

/// One (index, mode) call.
#[derive(Debug, Clone)]
pub struct DispatchStep {
    pub index: String,
    pub request: StepRequest,
}

impl DispatchStep {
    pub fn mode(&self) -> SearchMode {
        match self.request {
            StepRequest::Keyword(_) => SearchMode::Keyword,
            StepRequest::Vector(_) => SearchMode::Vector,
        }
    }

    pub fn source_id(&self) -> String {
        format!("{}:{}", self.index, self.mode())
    }
}

/// The complete dispatch plan for one query. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    /// Mode chosen by classification.
    pub requested: QueryMode,
    /// Mode actually dispatched after any vector fallback.
    pub mode: QueryMode,
    pub steps: Vec<DispatchStep>,
    pub expanded: ExpandedQuery,
    pub per_source_limit: usize,
    /// Set when vector steps were dropped.
    pub vector_fallback: Option<String>,
}

/// Builds dispatch plans.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    targets: Vec<PlanTarget>,
    short_query_tokens: usize,
    per_source_limit: usize,
    max_result_window: usize,
}

impl QueryPlanner {
    pub fn new(targets: Vec<PlanTarget>, config: &SearchConfig) -> Self {
        Self {
            targets,
            short_query_tokens: config.short_query_tokens,
            per_source_limit: config.per_source_limit,
            max_result_window: config.max_result_window,
        }
    }

    pub fn targets(&self) -> &[PlanTarget] {
        &self.targets
    }

    pub fn has_vector_targets(&self) -> bool {
        self.targets.iter().any(|t| t.supports_vector)
    }

    /// Decide the search mode for a query.
    pub fn classify(&self, query: &SearchQuery) -> QueryClass {
        let expanded = expand(query.text());

        let (mode, reason) = if let Some(mode) = query.mode() {
            (mode, ClassReason::Override)
        } else if expanded.has_multi_word_phrase() {
            (QueryMode::Hybrid, ClassReason::Phrase)
        } else if expanded
            .tokens
            .iter()
            .any(|t| INTENT_KEYWORDS.contains(&t.as_str()))
        {
            (QueryMode::Hybrid, ClassReason::Intent)
        } else if expanded.tokens.len() < self.short_query_tokens {
            (QueryMode::Keyword, ClassReason::ShortQuery)
        } else {
            (QueryMode::Hybrid, ClassReason::LongQuery)
        };

        QueryClass {
            mode,
            reason,
            expanded,
        }
    }

    /// Build the dispatch plan. `embedding` is the query vector, if any.
    pub fn plan(
        &self,
        query: &SearchQuery,
        embedding: Option<Arc<Embedding>>,
    ) -> Result<DispatchPlan, SearchError> {
        if self.targets.is_empty() {
            return Err(SearchError::Configuration(
                "no searchable index is registered".to_string(),
            ));
        }

        let class = self.classify(query);
        let limit = self
            .per_source_limit
            .max(query.page().end())
            .min(self.max_result_window);

        let wants_keyword = class.mode != QueryMode::Vector;
        let mut vector_fallback = None;
        let embedding = if class.wants_vectors() {
            match embedding {
                None => {
                    vector_fallback = Some("no query embedding available".to_string());
                    None
                }
                Some(_) if !self.has_vector_targets() => {
                    vector_fallback =
                        Some("no searchable index supports vector search".to_string());
                    None
                }
                Some(embedding) => Some(embedding),
            }
        } else {
            None
        };

        let mode = match (&embedding, class.mode) {
            (None, _) => QueryMode::Keyword,
            (Some(_), QueryMode::Vector) => QueryMode::Vector,
            (Some(_), _) => QueryMode::Hybrid,
        };

        let keyword = KeywordRequest {
            terms: class.expanded.terms.clone(),
            phrases: class.expanded.phrases.clone(),
            filters: query.filters().clone(),
            limit,
        };

        let mut steps = Vec::new();
        for target in &self.targets {
            if wants_keyword || embedding.is_none() {
                steps.push(DispatchStep {
                    index: target.index.clone(),
                    request: StepRequest::Keyword(keyword.clone()),
                });
            }
            if let Some(ref embedding) = embedding {
                if target.supports_vector {
                    steps.push(DispatchStep {
                        index: target.index.clone(),
                        request: StepRequest::Vector(VectorRequest {
                            embedding: Arc::clone(embedding),
                            filters: query.filters().clone(),
                            limit,
                        }),
                    });
                }
            }
        }

        if steps.is_empty() {
            return Err(SearchError::Configuration(
                "query plan has no steps".to_string(),
            ));
        }

        debug!(
            requested = %class.mode,
            mode = %mode,
            reason = ?class.reason,
            steps = steps.len(),
            fallback = vector_fallback.as_deref().unwrap_or(""),
            "Planned query"
        );

        Ok(DispatchPlan {
            requested: class.mode,
            mode,
            steps,
            expanded: class.expanded,
            per_source_limit: limit,
            vector_fallback,
        })
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
