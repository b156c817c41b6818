//! OpenAI and Azure OpenAI embedding provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use smartsource_config::{EmbeddingConfig, EmbeddingProviderKind};
use smartsource_protocols::{Embedding, EmbeddingError, EmbeddingProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Which flavour of the embeddings API to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingApi {
    /// `POST {base}/embeddings` with a bearer token.
    OpenAI,
    /// `POST {base}/openai/deployments/{deployment}/embeddings?api-version=..`
    /// with an `api-key` header.
    Azure {
        deployment: String,
        api_version: String,
    },
}

/// Configuration for OpenAI embeddings.
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingConfig {
    /// API key for OpenAI or the Azure resource.
    pub api_key: String,
    /// Model to use (default: text-embedding-3-small).
    pub model: String,
    /// Base URL for API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Expected embedding dimension (default: 1536).
    pub dimension: usize,
    /// Request timeout.
    pub timeout: Duration,
    pub api: EmbeddingApi,
}

impl OpenAIEmbeddingConfig {
    /// Create config with API key using defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            dimension: 1536,
            timeout: Duration::from_secs(30),
            api: EmbeddingApi::OpenAI,
        }
    }

    /// Config for an Azure OpenAI deployment.
    pub fn azure(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            base_url: endpoint.into(),
            api: EmbeddingApi::Azure {
                deployment: deployment.into(),
                api_version: api_version.into(),
            },
            ..Self::new(api_key)
        }
    }

    /// Build from the `[embedding]` section. Returns `None` for providers
    /// that are not served by this crate.
    pub fn from_config(config: &EmbeddingConfig) -> Option<Self> {
        let api_key = config.api_key.clone().unwrap_or_default();
        let settings = match config.provider {
            EmbeddingProviderKind::OpenAI => {
                let mut settings = Self::new(api_key);
                if let Some(ref base_url) = config.base_url {
                    settings.base_url = base_url.clone();
                }
                settings
            }
            EmbeddingProviderKind::Azure => Self::azure(
                api_key,
                config.base_url.clone().unwrap_or_default(),
                config
                    .deployment
                    .clone()
                    .unwrap_or_else(|| config.model.clone()),
                config.api_version.clone(),
            ),
            EmbeddingProviderKind::Hash | EmbeddingProviderKind::None => return None,
        };

        Some(
            settings
                .with_model(config.model.clone())
                .with_dimension(config.dimension)
                .with_timeout(config.timeout()),
        )
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for OpenAI-compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set embedding dimension.
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.api {
            EmbeddingApi::OpenAI => format!("{}/embeddings", base),
            EmbeddingApi::Azure { deployment, .. } => {
                format!("{}/openai/deployments/{}/embeddings", base, deployment)
            }
        }
    }
}

/// OpenAI embedding provider.
pub struct OpenAIEmbedding {
    client: reqwest::Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI embedding provider.
    pub fn new(config: OpenAIEmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                reqwest::Client::new()
            });
        Self { client, config }
    }

    /// Create from API key with defaults.
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(OpenAIEmbeddingConfig::new(api_key))
    }

    pub fn config(&self) -> &OpenAIEmbeddingConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Map a non-success status to an embedding error.
fn status_error(status: StatusCode, body: String) -> EmbeddingError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            EmbeddingError::InvalidInput(format!("API error {}: {}", status.as_u16(), body))
        }
        _ => EmbeddingError::Unavailable(format!("API error {}: {}", status.as_u16(), body)),
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("text is empty".to_string()));
        }

        let request = EmbeddingRequest {
            input: vec![text],
            model: &self.config.model,
        };

        let builder = self.client.post(self.config.endpoint()).json(&request);
        let builder = match &self.config.api {
            EmbeddingApi::OpenAI => builder.bearer_auth(&self.config.api_key),
            EmbeddingApi::Azure { api_version, .. } => builder
                .header("api-key", &self.config.api_key)
                .query(&[("api-version", api_version.as_str())]),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, body));
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Unavailable(format!("Parse error: {}", e)))?;

        let vector = embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Unavailable("Empty response".to_string()))?;

        if vector.len() != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }

        debug!(dimension = vector.len(), model = %self.config.model, "Generated embedding");
        Ok(Embedding::new(vector))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

#[cfg(test)]
#[path = "embedding_tests.rs"]
mod tests;
