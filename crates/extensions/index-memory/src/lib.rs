//! In-memory index for SmartSource.
//!
//! Documents are loaded from a JSON array, embedded once at load time, and
//! searched by brute force: term frequency with a phrase bonus for keyword
//! queries, cosine similarity for vector queries.

mod document;
mod hash_embedding;
mod index;

pub use document::{load_documents, matches_filters, DocumentLoadError, MemoryDocument};
pub use hash_embedding::HashEmbedding;
pub use index::MemoryIndex;
