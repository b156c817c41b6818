use super::*;
use chrono::TimeZone;
use serde_json::json;
use smartsource_protocols::{SearchMode, SourceContribution};

fn candidate(doc_id: &str, score: f64, metadata: serde_json::Value) -> FusedCandidate {
    let metadata = match metadata {
        Value::Object(map) => map,
        _ => HitMetadata::new(),
    };
    FusedCandidate {
        doc_id: doc_id.to_string(),
        fused_score: score,
        index: "wiki".to_string(),
        sources: vec![SourceContribution {
            index: "wiki".to_string(),
            mode: SearchMode::Keyword,
            rank: 1,
            contribution: score,
        }],
        metadata,
    }
}

fn processor() -> ResultProcessor {
    ResultProcessor::new(&SearchConfig::default())
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn page(offset: usize, limit: usize) -> Page {
    Page { offset, limit }
}

#[test]
fn test_process_builds_documents() {
    let candidates = vec![candidate(
        "doc-1",
        0.03,
        json!({
            "title": "Paris",
            "content": "Paris   is the\ncapital of France.",
            "url": "https://Example.com/wiki/Paris/#history"
        }),
    )];

    let page = processor().process_at(candidates, page(0, 5), now());
    assert_eq!(page.total_considered, 1);
    let doc = &page.documents[0];
    assert_eq!(doc.id, "doc-1");
    assert_eq!(doc.title, "Paris");
    assert_eq!(doc.excerpt, "Paris is the capital of France.");
    assert_eq!(
        doc.attribution.url.as_deref(),
        Some("https://example.com/wiki/Paris")
    );
    assert_eq!(
        doc.attribution.citation,
        "Paris (https://example.com/wiki/Paris)"
    );
    assert_eq!(doc.attribution.index, "wiki");
    assert_eq!(doc.fused_score, 0.03);
    assert_eq!(doc.adjusted_score, 0.03);
}

#[test]
fn test_missing_metadata_falls_back() {
    let page = processor().process_at(vec![candidate("doc-9", 0.01, json!({}))], page(0, 5), now());
    let doc = &page.documents[0];
    assert_eq!(doc.title, "doc-9");
    assert_eq!(doc.excerpt, "");
    assert!(doc.attribution.url.is_none());
    assert_eq!(doc.attribution.citation, "wiki/doc-9");
}

#[test]
fn test_invalid_url_dropped() {
    let page = processor().process_at(
        vec![candidate("d", 0.01, json!({"title": "T", "url": "not a url"}))],
        page(0, 5),
        now(),
    );
    assert!(page.documents[0].attribution.url.is_none());
    assert_eq!(page.documents[0].attribution.citation, "wiki/d");
}

#[test]
fn test_dedupe_keeps_highest_score() {
    let candidates = vec![
        candidate("a", 0.01, json!({"title": "low"})),
        candidate("b", 0.02, json!({})),
        candidate("a", 0.05, json!({"title": "high"})),
    ];
    let page = processor().process_at(candidates, page(0, 5), now());
    assert_eq!(page.total_considered, 2);
    assert_eq!(page.documents[0].id, "a");
    assert_eq!(page.documents[0].title, "high");
}

#[test]
fn test_stale_documents_are_demoted() {
    let candidates = vec![
        candidate("old", 0.0300, json!({"updated_at": "2020-01-01T00:00:00Z"})),
        candidate("new", 0.0290, json!({"updated_at": "2024-05-01"})),
        candidate("undated", 0.0280, json!({})),
    ];
    let page = processor().process_at(candidates, page(0, 5), now());

    let ids: Vec<_> = page.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "undated", "old"]);

    let old = &page.documents[2];
    assert_eq!(old.fused_score, 0.03);
    assert!((old.adjusted_score - 0.027).abs() < 1e-12);
    assert_eq!(page.documents[1].adjusted_score, 0.028);
}

#[test]
fn test_recency_never_zeroes() {
    let candidates = vec![candidate("old", 0.5, json!({"timestamp": 0}))];
    let page = processor().process_at(candidates, page(0, 5), now());
    assert!(page.documents[0].adjusted_score > 0.0);
}

#[test]
fn test_first_present_timestamp_field_wins() {
    // updated_at is recent even though published_at is old.
    let candidates = vec![candidate(
        "doc",
        0.1,
        json!({"published_at": "2001-01-01", "updated_at": "2024-05-30T12:00:00+02:00"}),
    )];
    let page = processor().process_at(candidates, page(0, 5), now());
    assert_eq!(page.documents[0].adjusted_score, 0.1);
}

#[test]
fn test_page_slicing() {
    let candidates: Vec<_> = (0..10)
        .map(|i| candidate(&format!("d{}", i), 1.0 - i as f64 * 0.01, json!({})))
        .collect();
    let page = processor().process_at(candidates, page(3, 4), now());
    assert_eq!(page.total_considered, 10);
    let ids: Vec<_> = page.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["d3", "d4", "d5", "d6"]);
}

#[test]
fn test_page_past_end_is_empty() {
    let page = processor().process_at(vec![candidate("a", 0.1, json!({}))], page(5, 5), now());
    assert!(page.documents.is_empty());
    assert_eq!(page.total_considered, 1);
}

#[test]
fn test_never_exceeds_limit_or_excerpt_max() {
    let processor = ResultProcessor::with_recency(40, &RecencyConfig::default());
    let long = "lorem ipsum dolor sit amet ".repeat(20);
    for limit in 1..=6 {
        let candidates: Vec<_> = (0..5)
            .map(|i| candidate(&format!("d{}", i), 0.1, json!({"content": long})))
            .collect();
        let page = processor.process_at(candidates, page(0, limit), now());
        assert!(page.documents.len() <= limit);
        for doc in &page.documents {
            assert!(doc.excerpt.chars().count() <= 40);
        }
    }
}

#[test]
fn test_truncate_excerpt_word_boundary() {
    assert_eq!(truncate_excerpt("hello wonderful world", 12), "hello…");
    assert_eq!(truncate_excerpt("hello wonderful world", 16), "hello wonderful…");
    assert_eq!(truncate_excerpt("short", 10), "short");
    assert_eq!(truncate_excerpt("exactly ten", 11), "exactly ten");
}

#[test]
fn test_truncate_excerpt_single_long_word() {
    let excerpt = truncate_excerpt("supercalifragilistic", 8);
    assert_eq!(excerpt, "superca…");
    assert_eq!(excerpt.chars().count(), 8);
}

#[test]
fn test_truncate_excerpt_multibyte() {
    let excerpt = truncate_excerpt("éééé éééé éééé", 7);
    assert_eq!(excerpt, "éééé…");
    assert!(excerpt.chars().count() <= 7);
}

#[test]
fn test_canonical_url() {
    assert_eq!(
        canonical_url("https://example.com/a/b/").as_deref(),
        Some("https://example.com/a/b")
    );
    assert_eq!(
        canonical_url("https://example.com/").as_deref(),
        Some("https://example.com/")
    );
    assert_eq!(
        canonical_url("https://example.com/page?q=1#top").as_deref(),
        Some("https://example.com/page?q=1")
    );
    assert!(canonical_url("relative/path").is_none());
}

#[test]
fn test_parse_timestamp_formats() {
    let expected = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    assert_eq!(parse_timestamp(&json!("2024-01-02T00:00:00Z")), Some(expected));
    assert_eq!(parse_timestamp(&json!("2024-01-02")), Some(expected));
    assert_eq!(
        parse_timestamp(&json!(expected.timestamp())),
        Some(expected)
    );
    assert_eq!(
        parse_timestamp(&json!(expected.timestamp().to_string())),
        Some(expected)
    );
    assert_eq!(parse_timestamp(&json!("yesterday")), None);
    assert_eq!(parse_timestamp(&json!(true)), None);
}
