//! Search pipeline, cache and retry configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::default_true;

/// Search pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// RRF smoothing constant `k`.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,

    /// Maximum query length in characters.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Largest page a caller may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Deepest result a caller may page to (`offset + limit`). Also caps
    /// the hits requested from each source.
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,

    /// Page size used when the caller does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Queries with fewer tokens than this (and no phrase or intent
    /// keyword) use keyword mode only.
    #[serde(default = "default_short_query_tokens")]
    pub short_query_tokens: usize,

    /// Hits requested from each (index, mode) source.
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,

    /// Timeout for a single source call.
    #[serde(default = "default_per_source_timeout_ms")]
    pub per_source_timeout_ms: u64,

    /// Overall deadline for the fan-out.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Maximum excerpt length in characters.
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,

    #[serde(default)]
    pub recency: RecencyConfig,
}

impl SearchConfig {
    pub fn per_source_timeout(&self) -> Duration {
        Duration::from_millis(self.per_source_timeout_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            max_query_length: default_max_query_length(),
            max_page_size: default_max_page_size(),
            max_result_window: default_max_result_window(),
            default_page_size: default_page_size(),
            short_query_tokens: default_short_query_tokens(),
            per_source_limit: default_per_source_limit(),
            per_source_timeout_ms: default_per_source_timeout_ms(),
            deadline_ms: default_deadline_ms(),
            excerpt_max_chars: default_excerpt_max_chars(),
            recency: RecencyConfig::default(),
        }
    }
}

fn default_rrf_k() -> f64 {
    60.0
}

fn default_max_query_length() -> usize {
    1024
}

fn default_max_page_size() -> usize {
    50
}

fn default_max_result_window() -> usize {
    10_000
}

fn default_page_size() -> usize {
    5
}

fn default_short_query_tokens() -> usize {
    3
}

fn default_per_source_limit() -> usize {
    20
}

fn default_per_source_timeout_ms() -> u64 {
    2000
}

fn default_deadline_ms() -> u64 {
    5000
}

fn default_excerpt_max_chars() -> usize {
    500
}

/// Recency adjustment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecencyConfig {
    /// Documents older than this are down-weighted.
    #[serde(default = "default_staleness_window_days")]
    pub staleness_window_days: u32,

    /// Score multiplier for stale documents, in (0, 1].
    #[serde(default = "default_staleness_multiplier")]
    pub multiplier: f64,

    /// Metadata fields checked, in order, for the document timestamp.
    #[serde(default = "default_timestamp_fields")]
    pub timestamp_fields: Vec<String>,
}

impl RecencyConfig {
    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.staleness_window_days) * 86_400)
    }
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            staleness_window_days: default_staleness_window_days(),
            multiplier: default_staleness_multiplier(),
            timestamp_fields: default_timestamp_fields(),
        }
    }
}

fn default_staleness_window_days() -> u32 {
    365
}

fn default_staleness_multiplier() -> f64 {
    0.9
}

fn default_timestamp_fields() -> Vec<String> {
    vec![
        "updated_at".to_string(),
        "published_at".to_string(),
        "timestamp".to_string(),
    ]
}

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lifetime of a complete response.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Lifetime of a response produced while some sources failed.
    #[serde(default = "default_degraded_ttl_secs")]
    pub degraded_ttl_secs: u64,

    /// Entry ceiling before least-recently-used eviction.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Interval of the background expiry sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn degraded_ttl(&self) -> Duration {
        Duration::from_secs(self.degraded_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            degraded_ttl_secs: default_degraded_ttl_secs(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_degraded_ttl_secs() -> u64 {
    15
}

fn default_max_entries() -> u64 {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Retry policy for transient backend errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2000
}
