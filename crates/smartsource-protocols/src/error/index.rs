//! Index backend errors.

use std::fmt;

use thiserror::Error;

use crate::index::SearchMode;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },
}

impl IndexError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            IndexError::Connection(_) => true,
            IndexError::Backend { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            IndexError::Timeout(_) | IndexError::MalformedQuery(_) => false,
        }
    }

    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::Timeout(_) => "timeout",
            IndexError::Connection(_) => "connection",
            IndexError::MalformedQuery(_) => "malformed_query",
            IndexError::Backend { .. } => "backend",
        }
    }
}

/// A single (index, mode) step that did not produce hits.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    /// `index:mode`.
    pub source_id: String,
    pub index: String,
    pub mode: SearchMode,
    pub error: IndexError,
}

impl SourceFailure {
    pub fn new(index: impl Into<String>, mode: SearchMode, error: IndexError) -> Self {
        let index = index.into();
        Self {
            source_id: format!("{}:{}", index, mode),
            index,
            mode,
            error,
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_id, self.error)
    }
}

impl std::error::Error for SourceFailure {}
