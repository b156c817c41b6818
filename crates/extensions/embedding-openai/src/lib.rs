//! OpenAI embedding client for SmartSource.
//!
//! Talks to the OpenAI `/embeddings` endpoint or to an Azure OpenAI
//! deployment and maps HTTP failures onto [`EmbeddingError`]:
//!
//! - 400 / 422: the input was rejected (`InvalidInput`)
//! - transport errors, 401 / 403, 429 and 5xx: `Unavailable`
//! - a vector of the wrong length: `DimensionMismatch`
//!
//! [`EmbeddingError`]: smartsource_protocols::EmbeddingError

mod embedding;

pub use embedding::{EmbeddingApi, OpenAIEmbedding, OpenAIEmbeddingConfig, DEFAULT_BASE_URL};
