use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert!((config.search.rrf_k - 60.0).abs() < f64::EPSILON);
    assert_eq!(config.search.default_page_size, 5);
    assert_eq!(config.search.max_page_size, 50);
    assert!(config.indexes.is_empty());
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::None);
}

#[test]
fn test_search_config_durations() {
    let search = SearchConfig::default();
    assert_eq!(search.per_source_timeout().as_millis(), 2000);
    assert_eq!(search.deadline().as_millis(), 5000);
}

#[test]
fn test_recency_config_default() {
    let recency = RecencyConfig::default();
    assert_eq!(recency.staleness_window_days, 365);
    assert!((recency.multiplier - 0.9).abs() < f64::EPSILON);
    assert_eq!(recency.timestamp_fields[0], "updated_at");
    assert_eq!(recency.staleness_window().as_secs(), 365 * 86_400);
}

#[test]
fn test_cache_config_default() {
    let cache = CacheConfig::default();
    assert!(cache.enabled);
    assert_eq!(cache.ttl().as_secs(), 300);
    assert_eq!(cache.degraded_ttl().as_secs(), 15);
    assert_eq!(cache.max_entries, 1000);
}

#[test]
fn test_elasticsearch_config_default() {
    let es = ElasticsearchConfig::default();
    assert_eq!(es.host, "http://localhost:9200");
    assert_eq!(es.timeout().as_secs(), 30);
    assert_eq!(es.vector_field, "embedding");
}

#[test]
fn test_index_config_remote_name() {
    let mut index = IndexConfig::new("docs", IndexBackend::Elasticsearch);
    assert_eq!(index.remote_name(), "docs");
    index.name = Some("docs-v2".to_string());
    assert_eq!(index.remote_name(), "docs-v2");
}

#[test]
fn test_index_config_deserialize_defaults() {
    let index: IndexConfig = toml::from_str(
        r#"
            id = "kb"
            backend = "memory"
            documents = "kb.json"
        "#,
    )
    .unwrap();
    assert!(index.searchable);
    assert!(index.vector);
    assert_eq!(index.backend, IndexBackend::Memory);
}

#[test]
fn test_unknown_backend_rejected() {
    let result: Result<IndexConfig, _> = toml::from_str(
        r#"
            id = "kb"
            backend = "solr"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_searchable_indexes() {
    let mut config = Config::default();
    config.indexes.push(IndexConfig::new("a", IndexBackend::Memory));
    let mut hidden = IndexConfig::new("b", IndexBackend::Memory);
    hidden.searchable = false;
    config.indexes.push(hidden);

    let ids: Vec<_> = config.searchable_indexes().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
    assert!(config.index("b").is_some());
    assert!(config.index("c").is_none());
}

#[test]
fn test_logging_format_serde() {
    let logging: LoggingConfig = toml::from_str("format = \"json\"").unwrap();
    assert_eq!(logging.format, LogFormat::Json);
    assert_eq!(logging.level, "info");
}
