//! Validated search queries.

use smartsource_config::SearchConfig;

use crate::expansion::expand;
use smartsource_protocols::{Filters, PageRequest, QueryMode, SearchError, SearchRequest};

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// Number of fused candidates needed to fill this page.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

/// Validate pagination parameters. `offset + limit` may not pass `max_window`.
pub fn validate_page(
    page: PageRequest,
    max_page_size: usize,
    max_window: usize,
) -> Result<Page, SearchError> {
    if page.offset < 0 {
        return Err(SearchError::InvalidPage(format!(
            "offset must not be negative, got {}",
            page.offset
        )));
    }
    if page.limit <= 0 {
        return Err(SearchError::InvalidPage(format!(
            "limit must be positive, got {}",
            page.limit
        )));
    }
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    if limit > max_page_size {
        return Err(SearchError::InvalidPage(format!(
            "limit {} exceeds the maximum page size {}",
            page.limit, max_page_size
        )));
    }
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let page = Page { offset, limit };
    if page.end() > max_window {
        return Err(SearchError::InvalidPage(format!(
            "offset {} plus limit {} exceeds the result window {}",
            page.offset, page.limit, max_window
        )));
    }
    Ok(page)
}

/// Validate query text, returning it trimmed with inner whitespace collapsed.
pub fn validate_text(text: &str, max_chars: usize) -> Result<String, SearchError> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Err(SearchError::InvalidQuery("query text is empty".to_string()));
    }
    let length = text.trim().chars().count();
    if length > max_chars {
        return Err(SearchError::InvalidQuery(format!(
            "query text is {} characters, the maximum is {}",
            length, max_chars
        )));
    }
    Ok(normalized)
}

/// An immutable, validated query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    text: String,
    filters: Filters,
    page: Page,
    mode: Option<QueryMode>,
}

impl SearchQuery {
    /// Validate a request against the search settings. No I/O.
    pub fn from_request(request: &SearchRequest, config: &SearchConfig) -> Result<Self, SearchError> {
        let default_limit = i64::try_from(config.default_page_size).unwrap_or(i64::MAX);
        let page = validate_page(
            request.page(default_limit),
            config.max_page_size,
            config.max_result_window,
        )?;
        let text = validate_text(&request.text, config.max_query_length)?;
        let expanded = expand(&text);
        if expanded.terms.is_empty() && expanded.phrases.is_empty() {
            return Err(SearchError::InvalidQuery(format!(
                "query text '{}' has no searchable words",
                text
            )));
        }
        Ok(Self {
            text,
            filters: request.filters.clone(),
            page,
            mode: request.mode,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn mode(&self) -> Option<QueryMode> {
        self.mode
    }
}
