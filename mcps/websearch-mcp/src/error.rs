//! Error types for query validation and upstream search

use std::time::Duration;

use rmcp::model::CallToolResult;
use serde_json::json;

/// A query that cannot be sent upstream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query must not be empty")]
    Empty,

    #[error("query is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("max_results must be at least 1")]
    ZeroResults,
}

impl QueryError {
    /// Argument the error is about
    pub fn field(&self) -> &'static str {
        match self {
            QueryError::Empty | QueryError::TooLong { .. } => "query",
            QueryError::ZeroResults => "max_results",
        }
    }
}

/// Failure talking to the search engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("could not parse search response: {0}")]
    Parse(String),

    #[error("rate limited by search engine{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {secs}s"),
        None => String::new(),
    }
}

impl SearchError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Network(_) => "network",
            SearchError::Parse(_) => "parse",
            SearchError::RateLimited { .. } => "rate_limited",
        }
    }

    /// Whether repeating the same call later could succeed
    ///
    /// A page we failed to understand will not parse any better next time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SearchError::Parse(_))
    }

    /// Map a transport failure from reqwest
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            SearchError::Network(format!(
                "request timed out after {}s",
                timeout.as_secs_f64()
            ))
        } else if err.is_decode() {
            SearchError::Parse(err.to_string())
        } else {
            SearchError::Network(err.to_string())
        }
    }

    /// Tool-level failure result describing this error
    pub fn to_tool_result(&self) -> CallToolResult {
        mcp_common::json_error(&json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }
        }))
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_names_field() {
        assert_eq!(QueryError::Empty.field(), "query");
        assert_eq!(QueryError::TooLong { len: 501, max: 500 }.field(), "query");
        assert_eq!(QueryError::ZeroResults.field(), "max_results");
        assert!(QueryError::ZeroResults.to_string().contains("max_results"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SearchError::Network("reset".into()).is_retryable());
        assert!(SearchError::RateLimited { retry_after: None }.is_retryable());
        assert!(!SearchError::Parse("bad html".into()).is_retryable());
    }

    #[test]
    fn test_rate_limited_message() {
        let err = SearchError::RateLimited {
            retry_after: Some(30),
        };
        assert_eq!(err.to_string(), "rate limited by search engine, retry after 30s");
        assert_eq!(
            SearchError::RateLimited { retry_after: None }.to_string(),
            "rate limited by search engine"
        );
    }

    #[test]
    fn test_to_tool_result() {
        let result = SearchError::Parse("no results container".into()).to_tool_result();
        assert_eq!(result.is_error, Some(true));

        let text = mcp_common::first_text(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(value["error"]["kind"], "parse");
        assert_eq!(value["error"]["retryable"], false);
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("no results container"));
    }
}
