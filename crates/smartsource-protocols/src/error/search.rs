//! Errors surfaced to the caller of a search.

use thiserror::Error;

use super::index::SourceFailure;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("All {} sources failed: {}", .failures.len(), join_failures(.failures))]
    AllSourcesFailed { failures: Vec<SourceFailure> },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SearchError {
    /// Validation errors are rejected before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::InvalidQuery(_) | SearchError::InvalidPage(_))
    }
}

fn join_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
