//! Result shapes handed back to the agent layer.

use serde::{Deserialize, Serialize};

use crate::index::SearchMode;

/// One source list that contributed to a document's fused score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    pub index: String,
    pub mode: SearchMode,
    /// 1-indexed rank in that source list.
    pub rank: usize,
    /// RRF contribution `1 / (k + rank)`.
    pub contribution: f64,
}

/// Where a result came from and how to cite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    /// Origin index (the best-ranked contributing source).
    pub index: String,
    /// Canonical URL, when the document carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Human-readable citation.
    pub citation: String,
    /// Every source list the document appeared in.
    pub sources: Vec<SourceContribution>,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub id: String,
    pub title: String,
    /// Normalized content excerpt, bounded in length.
    pub excerpt: String,
    pub attribution: SourceAttribution,
    /// Score from rank fusion.
    pub fused_score: f64,
    /// Score after recency adjustment.
    pub adjusted_score: f64,
}

/// Response returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ResultDocument>,
    /// Unique candidates considered before pagination.
    pub total_considered: usize,
    /// True when at least one source failed but results were still produced.
    pub degraded: bool,
    /// Identifiers of the failed sources (`index:mode`, or `embedding`).
    pub sources_failed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization_shape() {
        let response = SearchResponse {
            results: vec![ResultDocument {
                id: "doc-1".to_string(),
                title: "Paris".to_string(),
                excerpt: "Paris is the capital of France.".to_string(),
                attribution: SourceAttribution {
                    index: "wiki".to_string(),
                    url: None,
                    citation: "wiki/doc-1".to_string(),
                    sources: vec![SourceContribution {
                        index: "wiki".to_string(),
                        mode: SearchMode::Keyword,
                        rank: 1,
                        contribution: 1.0 / 61.0,
                    }],
                },
                fused_score: 1.0 / 61.0,
                adjusted_score: 1.0 / 61.0,
            }],
            total_considered: 1,
            degraded: true,
            sources_failed: vec!["news:vector".to_string()],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total_considered"], 1);
        assert_eq!(json["degraded"], true);
        assert_eq!(json["sources_failed"][0], "news:vector");
        assert_eq!(json["results"][0]["attribution"]["sources"][0]["mode"], "keyword");
        assert!(json["results"][0]["attribution"].get("url").is_none());
    }

    #[test]
    fn test_response_default_is_empty() {
        let response = SearchResponse::default();
        assert!(response.results.is_empty());
        assert!(!response.degraded);
    }
}
