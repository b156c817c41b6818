//! Elasticsearch `IndexClient`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use smartsource_config::{ElasticsearchConfig, IndexConfig};
use smartsource_protocols::{
    IndexClient, IndexError, KeywordRequest, RawHit, SearchMode, VectorRequest,
};

use crate::query::{keyword_query, vector_query};

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Cluster credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Basic { user: String, password: String },
    ApiKey(String),
}

impl Auth {
    /// An API key wins over basic credentials.
    pub fn from_config(config: &ElasticsearchConfig) -> Self {
        if let Some(ref key) = config.api_key {
            return Auth::ApiKey(key.clone());
        }
        match (&config.user, &config.password) {
            (Some(user), Some(password)) => Auth::Basic {
                user: user.clone(),
                password: password.clone(),
            },
            _ => Auth::None,
        }
    }
}

/// One Elasticsearch index exposed as a SmartSource index.
pub struct ElasticsearchIndex {
    id: String,
    search_url: Url,
    auth: Auth,
    text_fields: Vec<String>,
    vector_field: String,
    vector: bool,
    timeout: Duration,
    client: reqwest::Client,
}

impl ElasticsearchIndex {
    /// Create a client for `index_name` on the cluster described by `config`.
    pub fn new(
        id: impl Into<String>,
        index_name: &str,
        config: &ElasticsearchConfig,
    ) -> Result<Self, IndexError> {
        let mut base = Url::parse(&config.host).map_err(|e| {
            IndexError::Connection(format!("invalid Elasticsearch host '{}': {}", config.host, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let search_url = base
            .join(&format!("{}/_search", index_name))
            .map_err(|e| IndexError::Connection(format!("invalid index name '{}': {}", index_name, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| IndexError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            id: id.into(),
            search_url,
            auth: Auth::from_config(config),
            text_fields: config.text_fields.clone(),
            vector_field: config.vector_field.clone(),
            vector: true,
            timeout: config.timeout(),
            client,
        })
    }

    pub fn from_config(index: &IndexConfig, config: &ElasticsearchConfig) -> Result<Self, IndexError> {
        Ok(Self::new(&index.id, index.remote_name(), config)?.with_vector(index.vector))
    }

    /// Enable or disable kNN search for this index.
    pub fn with_vector(mut self, vector: bool) -> Self {
        self.vector = vector;
        self
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    async fn search(&self, body: Value, mode: SearchMode) -> Result<Vec<RawHit>, IndexError> {
        let request = self.client.post(self.search_url.clone()).json(&body);
        let request = match &self.auth {
            Auth::None => request,
            Auth::Basic { user, password } => request.basic_auth(user, Some(password)),
            Auth::ApiKey(key) => request.header("Authorization", format!("ApiKey {}", key)),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                IndexError::Timeout(self.timeout.as_millis() as u64)
            } else {
                IndexError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, &body));
        }

        let body: SearchBody = response.json().await.map_err(|e| IndexError::Backend {
            status: status.as_u16(),
            message: format!("unreadable search response: {}", e),
        })?;

        let hits: Vec<RawHit> = body
            .hits
            .hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| {
                RawHit::new(hit.id, self.id.clone(), mode, hit.score.unwrap_or(0.0), i + 1)
                    .with_metadata(hit.source.unwrap_or_default())
            })
            .collect();

        debug!(index = %self.id, mode = %mode, hits = hits.len(), "Elasticsearch search completed");
        Ok(hits)
    }

    fn status_error(&self, status: StatusCode, body: &str) -> IndexError {
        let message = error_reason(body);
        warn!(index = %self.id, status = status.as_u16(), "Elasticsearch request failed: {}", message);
        match status {
            StatusCode::BAD_REQUEST => IndexError::MalformedQuery(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                IndexError::Timeout(self.timeout.as_millis() as u64)
            }
            _ => IndexError::Backend {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Prefer `error.reason` from an Elasticsearch error body.
fn error_reason(body: &str) -> String {
    let reason = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/root_cause/0/reason")
            .or_else(|| v.pointer("/error/reason"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    match reason {
        Some(reason) => reason,
        None => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: Option<Map<String, Value>>,
}

#[async_trait]
impl IndexClient for ElasticsearchIndex {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_vector(&self) -> bool {
        self.vector
    }

    async fn keyword_search(&self, request: &KeywordRequest) -> Result<Vec<RawHit>, IndexError> {
        // An empty bool query matches every document.
        if request.terms.is_empty() && request.phrases.is_empty() {
            return Err(IndexError::MalformedQuery(
                "keyword query has no terms".to_string(),
            ));
        }
        let body = keyword_query(request, &self.text_fields, &self.vector_field);
        self.search(body, SearchMode::Keyword).await
    }

    async fn vector_search(&self, request: &VectorRequest) -> Result<Vec<RawHit>, IndexError> {
        if !self.vector {
            return Err(IndexError::MalformedQuery(format!(
                "index '{}' does not support vector search",
                self.id
            )));
        }
        let body = vector_query(request, &self.vector_field);
        self.search(body, SearchMode::Vector).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
