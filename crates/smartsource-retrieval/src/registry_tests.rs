use super::*;
use crate::test_support::MockIndex;
use smartsource_protocols::KeywordRequest;
use std::sync::atomic::{AtomicU32, Ordering};

struct MockFactory {
    created: AtomicU32,
}

#[async_trait]
impl IndexFactory for MockFactory {
    fn backend(&self) -> IndexBackend {
        IndexBackend::Memory
    }

    async fn create(
        &self,
        index: &IndexConfig,
        _config: &Config,
        _embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Arc<dyn IndexClient>, SearchError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockIndex::new(&index.id).keyword(&["doc-1"])))
    }
}

fn memory_index(id: &str) -> IndexConfig {
    let mut index = IndexConfig::new(id, IndexBackend::Memory);
    index.documents = Some("docs.json".into());
    index
}

#[test]
fn test_registry_new() {
    let registry = IndexRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.targets().is_empty());
}

#[test]
fn test_register_and_get() {
    let registry = IndexRegistry::default();
    registry
        .register(Arc::new(MockIndex::new("wiki")), IndexOptions::default())
        .unwrap();

    assert!(registry.contains("wiki"));
    assert_eq!(registry.client("wiki").unwrap().id(), "wiki");
    assert!(registry.client("news").is_none());
}

#[test]
fn test_register_duplicate() {
    let registry = IndexRegistry::new();
    registry
        .register(Arc::new(MockIndex::new("wiki")), IndexOptions::default())
        .unwrap();
    let result = registry.register(Arc::new(MockIndex::new("wiki")), IndexOptions::default());
    assert!(matches!(result, Err(SearchError::Configuration(_))));
}

#[test]
fn test_unregister() {
    let registry = IndexRegistry::new();
    registry
        .register(Arc::new(MockIndex::new("wiki")), IndexOptions::default())
        .unwrap();
    registry.unregister("wiki").unwrap();
    assert!(registry.is_empty());
    assert!(registry.unregister("wiki").is_err());
}

#[test]
fn test_targets_sorted_and_filtered() {
    let registry = IndexRegistry::new();
    registry
        .register(Arc::new(MockIndex::new("zeta")), IndexOptions::default())
        .unwrap();
    registry
        .register(Arc::new(MockIndex::new("alpha").keyword_only()), IndexOptions::default())
        .unwrap();
    registry
        .register(
            Arc::new(MockIndex::new("mid")),
            IndexOptions {
                searchable: true,
                vector: false,
            },
        )
        .unwrap();
    registry
        .register(
            Arc::new(MockIndex::new("hidden")),
            IndexOptions {
                searchable: false,
                vector: true,
            },
        )
        .unwrap();

    assert_eq!(
        registry.targets(),
        vec![
            PlanTarget::new("alpha", false),
            PlanTarget::new("mid", false),
            PlanTarget::new("zeta", true),
        ]
    );
    assert_eq!(registry.ids(), vec!["alpha", "hidden", "mid", "zeta"]);
}

#[test]
fn test_set_searchable() {
    let registry = IndexRegistry::new();
    registry
        .register(Arc::new(MockIndex::new("wiki")), IndexOptions::default())
        .unwrap();
    registry.set_searchable("wiki", false).unwrap();
    assert!(registry.targets().is_empty());
    assert!(registry.set_searchable("news", true).is_err());
}

#[tokio::test]
async fn test_load_from_config() {
    let registry = IndexRegistry::new();
    let factory = Arc::new(MockFactory {
        created: AtomicU32::new(0),
    });
    registry.register_factory(factory.clone());

    let mut config = Config::default();
    config.indexes.push(memory_index("kb"));
    let mut hidden = memory_index("archive");
    hidden.searchable = false;
    config.indexes.push(hidden);

    registry
        .load(&config, None, &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    assert_eq!(registry.targets(), vec![PlanTarget::new("kb", true)]);

    let hits = registry
        .client("kb")
        .unwrap()
        .keyword_search(&KeywordRequest::default())
        .await
        .unwrap();
    assert_eq!(hits[0].doc_id, "doc-1");
}

#[tokio::test]
async fn test_load_without_factory() {
    let registry = IndexRegistry::new();
    let mut config = Config::default();
    config
        .indexes
        .push(IndexConfig::new("docs", IndexBackend::Elasticsearch));

    let err = registry
        .load(&config, None, &RetryPolicy::none())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Configuration(msg) if msg.contains("elasticsearch")));
}
