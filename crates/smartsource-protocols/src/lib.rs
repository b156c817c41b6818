//! # SmartSource Protocols
//!
//! Core protocol definitions for the SmartSource retrieval engine.
//! Contains only interface definitions and the shared data model - no
//! search logic.
//!
//! ## Core Traits
//!
//! - [`IndexClient`] - Uniform interface over a single backend index
//! - [`EmbeddingProvider`] - Text to fixed-length vector capability

pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod query;

pub use document::{ResultDocument, SearchResponse, SourceAttribution, SourceContribution};
pub use embedding::{Embedding, EmbeddingProvider};
pub use error::{EmbeddingError, IndexError, SearchError, SourceFailure};
pub use index::{HitMetadata, IndexClient, KeywordRequest, RawHit, SearchMode, VectorRequest};
pub use query::{FilterValue, Filters, PageRequest, QueryMode, RangeFilter, SearchRequest};
