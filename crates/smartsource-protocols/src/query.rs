//! Inbound search request definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Filters keyed by metadata field name. Ordered so that identical filter
/// sets always serialize identically.
pub type Filters = BTreeMap<String, FilterValue>;

/// A single metadata filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Field must equal this value.
    Exact(String),
    /// Field must equal one of these values.
    OneOf(Vec<String>),
    /// Field must fall inside this range.
    Range(RangeFilter),
}

/// Inclusive range bounds. Numbers compare numerically, strings
/// lexicographically (ISO-8601 dates sort correctly).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<serde_json::Value>,
}

/// Explicit retrieval mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Keyword,
    Vector,
    Hybrid,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Keyword => write!(f, "keyword"),
            QueryMode::Vector => write!(f, "vector"),
            QueryMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyword" => Ok(QueryMode::Keyword),
            "vector" => Ok(QueryMode::Vector),
            "hybrid" => Ok(QueryMode::Hybrid),
            other => Err(format!("unknown query mode '{}'", other)),
        }
    }
}

/// Pagination parameters as received from the caller.
///
/// Signed so that negative values can be rejected rather than wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }
}

/// A search request from the agent/tool layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Natural-language query text.
    pub text: String,

    /// Metadata filters.
    #[serde(default)]
    pub filters: Filters,

    /// Result offset (defaults to 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    /// Page size (defaults to the configured page size).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// Explicit mode override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<QueryMode>,
}

impl SearchRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    pub fn with_page(mut self, offset: i64, limit: i64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Resolve the page, filling in defaults.
    pub fn page(&self, default_limit: i64) -> PageRequest {
        PageRequest {
            offset: self.offset.unwrap_or(0),
            limit: self.limit.unwrap_or(default_limit),
        }
    }
}
