//! Elasticsearch index client for SmartSource.
//!
//! Keyword search runs a `bool` query (`multi_match` for terms, phrase
//! matches for quoted phrases, filters in `filter` context). Vector search
//! runs an approximate `knn` query against a dense vector field.

mod client;
mod query;

pub use client::{Auth, ElasticsearchIndex};
pub use query::{filter_clauses, keyword_query, vector_query};
