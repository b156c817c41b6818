//! Document files and metadata filters.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use smartsource_protocols::{FilterValue, Filters, HitMetadata, RangeFilter};

#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate document id '{0}'")]
    DuplicateId(String),
}

/// One document as stored in a JSON document file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Any other field, e.g. `updated_at` or `lang`.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl MemoryDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            url: None,
            metadata: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Every field as hit metadata.
    pub fn to_metadata(&self) -> HitMetadata {
        let mut metadata = self.metadata.clone();
        metadata.insert("title".to_string(), Value::String(self.title.clone()));
        metadata.insert("content".to_string(), Value::String(self.content.clone()));
        if let Some(ref url) = self.url {
            metadata.insert("url".to_string(), Value::String(url.clone()));
        }
        metadata
    }

    /// Text used for embedding.
    pub fn embedding_text(&self) -> String {
        if self.title.is_empty() {
            self.content.clone()
        } else {
            format!("{}\n{}", self.title, self.content)
        }
    }
}

/// Read a JSON array of documents.
pub async fn load_documents(path: &Path) -> Result<Vec<MemoryDocument>, DocumentLoadError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DocumentLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let documents: Vec<MemoryDocument> =
        serde_json::from_str(&raw).map_err(|source| DocumentLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut seen = std::collections::HashSet::new();
    for doc in &documents {
        if !seen.insert(doc.id.as_str()) {
            return Err(DocumentLoadError::DuplicateId(doc.id.clone()));
        }
    }
    Ok(documents)
}

/// True when every filter matches the metadata. A missing field never
/// matches.
pub fn matches_filters(metadata: &HitMetadata, filters: &Filters) -> bool {
    filters.iter().all(|(field, filter)| {
        let Some(value) = metadata.get(field) else {
            return false;
        };
        match filter {
            FilterValue::Exact(expected) => values_of(value).any(|v| v == *expected),
            FilterValue::OneOf(options) => values_of(value).any(|v| options.contains(&v)),
            FilterValue::Range(range) => in_range(value, range),
        }
    })
}

/// Scalar values as strings; arrays match on any element.
fn values_of(value: &Value) -> Box<dyn Iterator<Item = String> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter().filter_map(scalar)),
        other => Box::new(scalar(other).into_iter()),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn in_range(value: &Value, range: &RangeFilter) -> bool {
    let above = range
        .gte
        .as_ref()
        .is_none_or(|bound| compare(value, bound).is_some_and(|o| o != Ordering::Less));
    let below = range
        .lte
        .as_ref()
        .is_none_or(|bound| compare(value, bound).is_some_and(|o| o != Ordering::Greater));
    above && below
}

/// Numbers compare numerically, strings lexicographically.
fn compare(value: &Value, bound: &Value) -> Option<Ordering> {
    match (value, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), Value::Number(b)) => a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}
