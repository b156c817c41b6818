//! Query expansion: normalization, phrase extraction, stopwords and synonyms.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Maximum number of synonym terms appended to one query.
pub const MAX_SYNONYMS: usize = 5;

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from",
    "how", "i", "in", "is", "it", "me", "of", "on", "or", "that", "the", "this", "to", "was",
    "what", "when", "where", "which", "who", "why", "with",
];

const SYNONYMS: &[(&str, &[&str])] = &[
    ("bug", &["defect", "issue"]),
    ("car", &["automobile", "vehicle"]),
    ("config", &["configuration", "settings"]),
    ("configure", &["setup"]),
    ("delete", &["remove"]),
    ("doc", &["documentation"]),
    ("docs", &["documentation"]),
    ("error", &["failure", "exception"]),
    ("fast", &["quick"]),
    ("install", &["setup"]),
    ("login", &["signin", "authentication"]),
    ("price", &["cost", "pricing"]),
    ("remove", &["delete"]),
    ("slow", &["latency"]),
    ("start", &["begin", "launch"]),
];

/// The normalized forms of one query's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedQuery {
    /// Every lowercase token in the text, in order, stopwords included.
    pub tokens: Vec<String>,
    /// Keyword terms after stopword removal and synonym expansion.
    pub terms: Vec<String>,
    /// Quoted phrases, case preserved.
    pub phrases: Vec<String>,
}

impl ExpandedQuery {
    /// True when a quoted phrase has more than one word.
    pub fn has_multi_word_phrase(&self) -> bool {
        self.phrases
            .iter()
            .any(|p| p.split_whitespace().nth(1).is_some())
    }
}

/// Expand raw query text.
pub fn expand(text: &str) -> ExpandedQuery {
    let mut tokens = Vec::new();
    let mut phrases = Vec::new();
    let mut loose = Vec::new();

    let parts: Vec<&str> = text.split('"').collect();
    for (i, part) in parts.iter().enumerate() {
        // Odd segments sit between two quotes, except an unterminated tail.
        let quoted = i % 2 == 1 && i + 1 < parts.len();
        let words = tokenize(part);
        if quoted {
            let phrase = part.split_whitespace().collect::<Vec<_>>().join(" ");
            if !words.is_empty() && !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        } else {
            loose.extend(words.iter().cloned());
        }
        tokens.extend(words);
    }

    let mut terms: Vec<String> = loose
        .iter()
        .filter(|t| !is_stopword(t))
        .cloned()
        .collect();
    if terms.is_empty() {
        terms = loose;
    }

    let mut seen = HashSet::new();
    terms.retain(|t| seen.insert(t.clone()));

    let mut added = 0;
    let base = terms.clone();
    'outer: for term in &base {
        for synonym in synonyms(term) {
            if added == MAX_SYNONYMS {
                break 'outer;
            }
            if seen.insert((*synonym).to_string()) {
                terms.push((*synonym).to_string());
                added += 1;
            }
        }
    }

    ExpandedQuery {
        tokens,
        terms,
        phrases,
    }
}

/// Split on whitespace, lowercase, and trim surrounding punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

fn synonyms(term: &str) -> &'static [&'static str] {
    SYNONYMS
        .binary_search_by(|(word, _)| word.cmp(&term))
        .map(|i| SYNONYMS[i].1)
        .unwrap_or(&[])
}
