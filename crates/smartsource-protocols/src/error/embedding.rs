//! Embedding service errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    #[error("Embedding service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Whether the failure reflects the service rather than the input.
    pub fn is_service_failure(&self) -> bool {
        !matches!(self, EmbeddingError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_display() {
        let err = EmbeddingError::Unavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Embedding service unavailable: connection refused"
        );

        let err = EmbeddingError::InvalidInput("bad input".to_string());
        assert_eq!(err.to_string(), "Invalid input: bad input");
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = EmbeddingError::DimensionMismatch {
            expected: 1536,
            actual: 3,
        };
        assert!(err.to_string().contains("1536"));
    }

    #[test]
    fn test_is_service_failure() {
        assert!(EmbeddingError::Unavailable(String::new()).is_service_failure());
        assert!(EmbeddingError::DimensionMismatch { expected: 2, actual: 1 }.is_service_failure());
        assert!(!EmbeddingError::InvalidInput(String::new()).is_service_failure());
    }
}
