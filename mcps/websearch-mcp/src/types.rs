//! Common types for web search queries and results
//!
//! [`SearchQuery`] is validated on construction and immutable afterwards;
//! results are plain data produced by a backend in engine ranking order.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Longest accepted query, in characters after trimming
pub const MAX_QUERY_CHARS: usize = 500;

/// Hard upper bound on results per query; larger requests are clamped
pub const MAX_RESULTS_LIMIT: usize = 50;

/// Results returned when neither the caller nor the config says otherwise
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// A validated search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    max_results: usize,
}

impl SearchQuery {
    /// Validate `text` and clamp `max_results` into `1..=MAX_RESULTS_LIMIT`
    ///
    /// Zero results is rejected rather than clamped up: a caller asking for
    /// nothing has made a mistake worth reporting.
    pub fn new(text: &str, max_results: usize) -> Result<Self, QueryError> {
        let text = normalize_query_text(text)?;
        if max_results == 0 {
            return Err(QueryError::ZeroResults);
        }

        Ok(Self {
            text,
            max_results: max_results.min(MAX_RESULTS_LIMIT),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub(crate) fn cache_key(&self) -> String {
        format!("{}\u{1f}{}", self.text, self.max_results)
    }
}

/// Trim a query and check its length
pub fn normalize_query_text(text: &str) -> Result<String, QueryError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(QueryError::Empty);
    }

    let len = text.chars().count();
    if len > MAX_QUERY_CHARS {
        return Err(QueryError::TooLong {
            len,
            max: MAX_QUERY_CHARS,
        });
    }

    Ok(text.to_string())
}

/// A single web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The title of the result
    pub title: String,
    /// Absolute http(s) URL of the result
    pub url: String,
    /// A description or snippet of the result, possibly empty
    pub snippet: String,
}

/// A collection of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// The search query that was executed
    pub query: String,
    /// The backend that was used
    pub backend: String,
    /// The search results, in engine ranking order
    pub results: Vec<SearchResult>,
    /// Whether the results were served from the in-process cache
    pub cached: bool,
}

/// Output format for tool results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Markdown for direct display
    Markdown,
}

/// A DuckDuckGo instant answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstantAnswer {
    pub heading: String,
    pub abstract_text: String,
    pub abstract_source: String,
    pub abstract_url: String,
    pub answer: String,
    pub definition: String,
    pub definition_source: String,
    pub definition_url: String,
    pub related: Vec<RelatedTopic>,
}

impl InstantAnswer {
    /// True when the engine had nothing to say about the query
    pub fn is_empty(&self) -> bool {
        self.abstract_text.is_empty()
            && self.answer.is_empty()
            && self.definition.is_empty()
            && self.related.is_empty()
    }
}

/// A topic related to an instant answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelatedTopic {
    Topic(TopicLink),
    Category { name: String, topics: Vec<TopicLink> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicLink {
    pub text: String,
    pub url: String,
}
