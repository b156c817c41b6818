//! Result processing: dedupe, recency adjustment, excerpts, attribution and
//! pagination.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::debug;
use url::Url;

use smartsource_config::{RecencyConfig, SearchConfig};
use smartsource_protocols::{HitMetadata, ResultDocument, SourceAttribution};

use crate::fusion::{rank_order, FusedCandidate};
use crate::query::Page;

const ELLIPSIS: char = '…';
const EXCERPT_FIELDS: &[&str] = &["excerpt", "content", "text", "body"];

/// One page of processed results.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPage {
    pub documents: Vec<ResultDocument>,
    /// Distinct documents considered before slicing.
    pub total_considered: usize,
}

struct Scored {
    candidate: FusedCandidate,
    adjusted: f64,
}

/// Turns fused candidates into result documents.
#[derive(Debug, Clone)]
pub struct ResultProcessor {
    excerpt_max_chars: usize,
    staleness_window: Duration,
    multiplier: f64,
    timestamp_fields: Vec<String>,
}

impl ResultProcessor {
    pub fn new(config: &SearchConfig) -> Self {
        Self::with_recency(config.excerpt_max_chars, &config.recency)
    }

    pub fn with_recency(excerpt_max_chars: usize, recency: &RecencyConfig) -> Self {
        Self {
            excerpt_max_chars,
            staleness_window: recency.staleness_window(),
            multiplier: recency.multiplier,
            timestamp_fields: recency.timestamp_fields.clone(),
        }
    }

    /// Process candidates into the requested page, judging staleness
    /// against the current time.
    pub fn process(&self, candidates: Vec<FusedCandidate>, page: Page) -> ProcessedPage {
        self.process_at(candidates, page, Utc::now())
    }

    pub fn process_at(
        &self,
        candidates: Vec<FusedCandidate>,
        page: Page,
        now: DateTime<Utc>,
    ) -> ProcessedPage {
        let mut scored = dedupe(candidates)
            .into_iter()
            .map(|candidate| {
                let adjusted = self.adjust(&candidate, now);
                Scored {
                    candidate,
                    adjusted,
                }
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| {
            rank_order(
                (a.adjusted, a.candidate.sources.len(), a.candidate.doc_id.as_str()),
                (b.adjusted, b.candidate.sources.len(), b.candidate.doc_id.as_str()),
            )
        });

        let total_considered = scored.len();
        let documents = scored
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|s| self.document(s))
            .collect();

        ProcessedPage {
            documents,
            total_considered,
        }
    }

    fn adjust(&self, candidate: &FusedCandidate, now: DateTime<Utc>) -> f64 {
        let Some(timestamp) = self.timestamp(&candidate.metadata) else {
            return candidate.fused_score;
        };
        let age = now.signed_duration_since(timestamp);
        let stale = age
            .to_std()
            .map(|age| age > self.staleness_window)
            .unwrap_or(false);
        if stale {
            candidate.fused_score * self.multiplier
        } else {
            candidate.fused_score
        }
    }

    fn timestamp(&self, metadata: &HitMetadata) -> Option<DateTime<Utc>> {
        let (field, value) = self
            .timestamp_fields
            .iter()
            .find_map(|field| metadata.get(field).map(|value| (field, value)))?;
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            debug!(field = %field, "Ignoring unparseable timestamp");
        }
        parsed
    }

    fn document(&self, scored: Scored) -> ResultDocument {
        let Scored {
            candidate,
            adjusted,
        } = scored;
        let metadata = &candidate.metadata;

        let title = metadata
            .get("title")
            .and_then(Value::as_str)
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| candidate.doc_id.clone());

        let excerpt = EXCERPT_FIELDS
            .iter()
            .find_map(|field| metadata.get(*field).and_then(Value::as_str))
            .map(|text| truncate_excerpt(text, self.excerpt_max_chars))
            .unwrap_or_default();

        let url = metadata
            .get("url")
            .and_then(Value::as_str)
            .and_then(canonical_url);

        let citation = match url {
            Some(ref url) => format!("{} ({})", title, url),
            None => format!("{}/{}", candidate.index, candidate.doc_id),
        };

        ResultDocument {
            id: candidate.doc_id,
            title,
            excerpt,
            attribution: SourceAttribution {
                index: candidate.index,
                url,
                citation,
                sources: candidate.sources,
            },
            fused_score: candidate.fused_score,
            adjusted_score: adjusted,
        }
    }
}

/// Keep the highest-scoring occurrence of each document id.
fn dedupe(candidates: Vec<FusedCandidate>) -> Vec<FusedCandidate> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<FusedCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match positions.get(&candidate.doc_id) {
            Some(&i) => {
                if candidate.fused_score > unique[i].fused_score {
                    unique[i] = candidate;
                }
            }
            None => {
                positions.insert(candidate.doc_id.clone(), unique.len());
                unique.push(candidate);
            }
        }
    }
    unique
}

/// Parse an RFC 3339 string, a `YYYY-MM-DD` date or epoch seconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
            }
            s.parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// Collapse whitespace and cut to at most `max_chars` characters at a word
/// boundary. The ellipsis counts towards the limit.
pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    if max_chars == 0 {
        return String::new();
    }

    let budget = max_chars - 1;
    let prefix: String = collapsed.chars().take(budget).collect();
    let next_is_space = collapsed
        .chars()
        .nth(budget)
        .is_some_and(char::is_whitespace);

    let cut = if next_is_space {
        prefix.as_str()
    } else {
        match prefix.rfind(' ') {
            Some(pos) if pos > 0 => &prefix[..pos],
            _ => prefix.as_str(),
        }
    };

    let mut excerpt = cut.trim_end().to_string();
    excerpt.push(ELLIPSIS);
    excerpt
}

/// Parse a URL, drop the fragment and a trailing slash on non-root paths.
pub fn canonical_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }
    Some(url.to_string())
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
