//! Query DSL builders.

use serde_json::{json, Map, Value};

use smartsource_protocols::{FilterValue, Filters, KeywordRequest, VectorRequest};

/// Upper bound Elasticsearch accepts for `num_candidates`.
const MAX_NUM_CANDIDATES: usize = 10_000;

/// Default `index.max_result_window`; larger `size` values are rejected.
const MAX_RESULT_WINDOW: usize = 10_000;

/// Translate metadata filters into `term` / `terms` / `range` clauses.
pub fn filter_clauses(filters: &Filters) -> Vec<Value> {
    filters
        .iter()
        .map(|(field, value)| match value {
            FilterValue::Exact(v) => json!({"term": {field.as_str(): v}}),
            FilterValue::OneOf(values) => json!({"terms": {field.as_str(): values}}),
            FilterValue::Range(range) => {
                let mut bounds = Map::new();
                if let Some(ref gte) = range.gte {
                    bounds.insert("gte".to_string(), gte.clone());
                }
                if let Some(ref lte) = range.lte {
                    bounds.insert("lte".to_string(), lte.clone());
                }
                json!({"range": {field.as_str(): bounds}})
            }
        })
        .collect()
}

/// Lexical `bool` query. Terms are optional (`should`), every phrase is
/// required (`must`).
pub fn keyword_query(request: &KeywordRequest, text_fields: &[String], vector_field: &str) -> Value {
    let mut should = Vec::new();
    if !request.terms.is_empty() {
        should.push(json!({
            "multi_match": {
                "query": request.terms.join(" "),
                "fields": text_fields,
            }
        }));
    }

    // `multi_match` of type `phrase` runs `match_phrase` on each field.
    let must: Vec<Value> = request
        .phrases
        .iter()
        .map(|phrase| {
            json!({
                "multi_match": {
                    "query": phrase,
                    "type": "phrase",
                    "fields": text_fields,
                }
            })
        })
        .collect();

    let minimum_should_match = if must.is_empty() && !should.is_empty() { 1 } else { 0 };

    json!({
        "size": request.limit.min(MAX_RESULT_WINDOW),
        "query": {
            "bool": {
                "should": should,
                "must": must,
                "filter": filter_clauses(&request.filters),
                "minimum_should_match": minimum_should_match,
            }
        },
        "_source": {"excludes": [vector_field]},
    })
}

/// Approximate kNN query on `vector_field`.
pub fn vector_query(request: &VectorRequest, vector_field: &str) -> Value {
    let k = request.limit.min(MAX_NUM_CANDIDATES);
    let num_candidates = k.saturating_mul(10).clamp(100, MAX_NUM_CANDIDATES);
    json!({
        "size": k,
        "knn": {
            "field": vector_field,
            "query_vector": request.embedding.vector,
            "k": k,
            "num_candidates": num_candidates.max(k),
            "filter": filter_clauses(&request.filters),
        },
        "_source": {"excludes": [vector_field]},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartsource_protocols::{Embedding, RangeFilter};
    use std::sync::Arc;

    fn fields() -> Vec<String> {
        vec!["title^2".to_string(), "content".to_string()]
    }

    #[test]
    fn test_filter_clauses() {
        let mut filters = Filters::new();
        filters.insert("lang".to_string(), FilterValue::Exact("en".to_string()));
        filters.insert(
            "tag".to_string(),
            FilterValue::OneOf(vec!["a".to_string(), "b".to_string()]),
        );
        filters.insert(
            "year".to_string(),
            FilterValue::Range(RangeFilter {
                gte: Some(json!(2020)),
                lte: None,
            }),
        );

        let clauses = filter_clauses(&filters);
        assert_eq!(
            clauses,
            vec![
                json!({"term": {"lang": "en"}}),
                json!({"terms": {"tag": ["a", "b"]}}),
                json!({"range": {"year": {"gte": 2020}}}),
            ]
        );
    }

    #[test]
    fn test_keyword_query_terms_only() {
        let request = KeywordRequest {
            terms: vec!["capital".to_string(), "france".to_string()],
            limit: 20,
            ..Default::default()
        };
        let query = keyword_query(&request, &fields(), "embedding");

        assert_eq!(query["size"], 20);
        let bool_query = &query["query"]["bool"];
        assert_eq!(bool_query["should"][0]["multi_match"]["query"], "capital france");
        assert_eq!(bool_query["should"][0]["multi_match"]["fields"][0], "title^2");
        assert_eq!(bool_query["must"], json!([]));
        assert_eq!(bool_query["minimum_should_match"], 1);
        assert_eq!(query["_source"]["excludes"][0], "embedding");
    }

    #[test]
    fn test_keyword_query_phrases_are_required() {
        let request = KeywordRequest {
            terms: vec!["tower".to_string()],
            phrases: vec!["Eiffel Tower".to_string()],
            limit: 5,
            ..Default::default()
        };
        let query = keyword_query(&request, &fields(), "embedding");

        let must = &query["query"]["bool"]["must"];
        assert_eq!(must[0]["multi_match"]["query"], "Eiffel Tower");
        assert_eq!(must[0]["multi_match"]["type"], "phrase");
        assert_eq!(query["query"]["bool"]["minimum_should_match"], 0);
    }

    #[test]
    fn test_vector_query() {
        let mut filters = Filters::new();
        filters.insert("lang".to_string(), FilterValue::Exact("en".to_string()));
        let request = VectorRequest {
            embedding: Arc::new(Embedding::new(vec![0.5, -0.5])),
            filters,
            limit: 20,
        };
        let query = vector_query(&request, "embedding");

        assert_eq!(query["knn"]["field"], "embedding");
        assert_eq!(query["knn"]["query_vector"], json!([0.5, -0.5]));
        assert_eq!(query["knn"]["k"], 20);
        assert_eq!(query["knn"]["num_candidates"], 200);
        assert_eq!(query["knn"]["filter"][0], json!({"term": {"lang": "en"}}));
    }

    #[test]
    fn test_vector_query_candidate_floor() {
        let request = VectorRequest {
            embedding: Arc::new(Embedding::new(vec![1.0])),
            filters: Filters::new(),
            limit: 3,
        };
        assert_eq!(vector_query(&request, "v")["knn"]["num_candidates"], 100);
    }

    #[test]
    fn test_huge_limits_stay_inside_result_window() {
        let request = VectorRequest {
            embedding: Arc::new(Embedding::new(vec![1.0])),
            filters: Filters::new(),
            limit: usize::MAX - 5,
        };
        let query = vector_query(&request, "v");
        assert_eq!(query["size"], 10_000);
        assert_eq!(query["knn"]["k"], 10_000);
        assert_eq!(query["knn"]["num_candidates"], 10_000);

        let request = KeywordRequest {
            terms: vec!["rust".to_string()],
            limit: 50_000,
            ..Default::default()
        };
        assert_eq!(keyword_query(&request, &fields(), "v")["size"], 10_000);
    }
}
