//! Configuration validation.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::schema::{Config, EmbeddingProviderKind, IndexBackend};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_search(config, &mut result);
        Self::validate_cache(config, &mut result);
        Self::validate_indexes(config, &mut result);
        Self::validate_elasticsearch(config, &mut result);
        Self::validate_embedding(config, &mut result);

        Ok(result)
    }

    fn validate_search(config: &Config, result: &mut ValidationResult) {
        let search = &config.search;

        if search.rrf_k <= 0.0 || !search.rrf_k.is_finite() {
            result.add_error(ValidationError::new(
                "search.rrf_k",
                "rrf_k must be a positive number",
            ));
        }

        if search.max_query_length == 0 {
            result.add_error(ValidationError::new(
                "search.max_query_length",
                "max_query_length must be greater than 0",
            ));
        }

        if search.max_page_size == 0 {
            result.add_error(ValidationError::new(
                "search.max_page_size",
                "max_page_size must be greater than 0",
            ));
        }

        if search.max_result_window < search.max_page_size {
            result.add_error(ValidationError::new(
                "search.max_result_window",
                format!(
                    "max_result_window must be at least max_page_size ({})",
                    search.max_page_size
                ),
            ));
        }

        if search.default_page_size == 0 || search.default_page_size > search.max_page_size {
            result.add_error(ValidationError::new(
                "search.default_page_size",
                format!(
                    "default_page_size must be between 1 and max_page_size ({})",
                    search.max_page_size
                ),
            ));
        }

        if search.short_query_tokens == 0 {
            result.add_error(ValidationError::new(
                "search.short_query_tokens",
                "short_query_tokens must be greater than 0",
            ));
        }

        if search.per_source_limit == 0 {
            result.add_error(ValidationError::new(
                "search.per_source_limit",
                "per_source_limit must be greater than 0",
            ));
        }

        if search.per_source_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "search.per_source_timeout_ms",
                "per_source_timeout_ms must be greater than 0",
            ));
        }

        if search.deadline_ms == 0 {
            result.add_error(ValidationError::new(
                "search.deadline_ms",
                "deadline_ms must be greater than 0",
            ));
        } else if search.deadline_ms < search.per_source_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "search.deadline_ms",
                "deadline is shorter than the per-source timeout; slow sources will be cut off early",
            ));
        }

        if search.excerpt_max_chars < 2 {
            result.add_error(ValidationError::new(
                "search.excerpt_max_chars",
                "excerpt_max_chars must be at least 2",
            ));
        }

        let multiplier = search.recency.multiplier;
        if multiplier.is_nan() || multiplier <= 0.0 || multiplier > 1.0 {
            result.add_error(ValidationError::new(
                "search.recency.multiplier",
                "multiplier must be in (0, 1]",
            ));
        }

        if search.recency.timestamp_fields.is_empty() {
            result.add_warning(ValidationWarning::new(
                "search.recency.timestamp_fields",
                "no timestamp fields configured, recency adjustment is disabled",
            ));
        }
    }

    fn validate_cache(config: &Config, result: &mut ValidationResult) {
        let cache = &config.cache;
        if !cache.enabled {
            return;
        }

        if cache.ttl_secs == 0 {
            result.add_error(ValidationError::new(
                "cache.ttl_secs",
                "ttl_secs must be greater than 0 (disable the cache instead)",
            ));
        }

        if cache.max_entries == 0 {
            result.add_error(ValidationError::new(
                "cache.max_entries",
                "max_entries must be greater than 0",
            ));
        }

        if cache.sweep_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "cache.sweep_interval_secs",
                "sweep_interval_secs must be greater than 0",
            ));
        }

        if cache.degraded_ttl_secs > cache.ttl_secs {
            result.add_warning(ValidationWarning::new(
                "cache.degraded_ttl_secs",
                "degraded responses outlive complete ones",
            ));
        }
    }

    fn validate_indexes(config: &Config, result: &mut ValidationResult) {
        if config.indexes.is_empty() {
            result.add_error(ValidationError::new(
                "indexes",
                "at least one index must be configured",
            ));
            return;
        }

        let mut seen = HashSet::new();
        for (i, index) in config.indexes.iter().enumerate() {
            let path = format!("indexes[{}]", i);

            if index.id.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.id", path),
                    "index id cannot be empty",
                ));
            } else if index.id.contains(':') {
                result.add_error(ValidationError::new(
                    format!("{}.id", path),
                    "index id cannot contain ':'",
                ));
            }

            if !seen.insert(index.id.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.id", path),
                    format!("duplicate index id '{}'", index.id),
                ));
            }

            if index.backend == IndexBackend::Memory && index.documents.is_none() {
                result.add_error(ValidationError::new(
                    format!("{}.documents", path),
                    "memory backend requires a documents file",
                ));
            }

            if let Some(ref documents) = index.documents {
                if !documents.exists() {
                    result.add_warning(ValidationWarning::new(
                        format!("{}.documents", path),
                        format!("documents file does not exist: {:?}", documents),
                    ));
                }
            }
        }

        if config.searchable_indexes().next().is_none() {
            result.add_error(ValidationError::new(
                "indexes",
                "no index is marked searchable",
            ));
        }
    }

    fn validate_elasticsearch(config: &Config, result: &mut ValidationResult) {
        let uses_es = config
            .indexes
            .iter()
            .any(|i| i.backend == IndexBackend::Elasticsearch);
        if !uses_es {
            return;
        }

        let es = &config.elasticsearch;
        if !es.host.starts_with("http://") && !es.host.starts_with("https://") {
            result.add_error(ValidationError::new(
                "elasticsearch.host",
                "host must start with http:// or https://",
            ));
        }

        if es.user.is_some() != es.password.is_some() {
            result.add_error(ValidationError::new(
                "elasticsearch.user",
                "both user and password must be provided if one is set",
            ));
        }

        if es.text_fields.is_empty() {
            result.add_error(ValidationError::new(
                "elasticsearch.text_fields",
                "at least one text field is required for keyword search",
            ));
        }
    }

    fn validate_embedding(config: &Config, result: &mut ValidationResult) {
        let embedding = &config.embedding;
        let any_vector = config.searchable_indexes().any(|i| i.vector);

        match embedding.provider {
            EmbeddingProviderKind::None => {
                if any_vector {
                    result.add_warning(ValidationWarning::new(
                        "embedding.provider",
                        "vector-capable indexes are configured but no embedding provider is set; searches will be keyword-only",
                    ));
                }
                return;
            }
            EmbeddingProviderKind::OpenAI | EmbeddingProviderKind::Azure => {
                if embedding.api_key.is_none() {
                    result.add_warning(ValidationWarning::new(
                        "embedding.api_key",
                        "API key is not set, may need to be set via environment variable",
                    ));
                }
            }
            EmbeddingProviderKind::Hash => {}
        }

        if embedding.provider == EmbeddingProviderKind::Azure && embedding.base_url.is_none() {
            result.add_error(ValidationError::new(
                "embedding.base_url",
                "Azure embeddings require the resource endpoint as base_url",
            ));
        }

        if let Some(ref url) = embedding.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "embedding.base_url",
                    "base_url must start with http:// or https://",
                ));
            }
        }

        if embedding.dimension == 0 {
            result.add_error(ValidationError::new(
                "embedding.dimension",
                "dimension must be greater than 0",
            ));
        }

        if !any_vector {
            result.add_warning(ValidationWarning::new(
                "embedding.provider",
                "an embedding provider is configured but no searchable index supports vectors",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
