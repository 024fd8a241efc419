//! Search backend implementations
//!
//! This module provides a trait-based abstraction for search backends.
//! Currently supports DuckDuckGo (HTML results and the Instant Answer API).

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::types::{InstantAnswer, SearchQuery, SearchResult};

pub mod duckduckgo;

/// Trait for search backends
///
/// Implementations make exactly one upstream attempt per call. Whether to
/// try again is the caller's decision, guided by
/// [`SearchError::is_retryable`](crate::error::SearchError::is_retryable).
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Get the name of this backend
    fn name(&self) -> &str;

    /// Perform a web search, returning at most `query.max_results()` results
    /// in engine ranking order
    async fn search(&self, query: &SearchQuery) -> BackendResult<Vec<SearchResult>>;

    /// Look up an instant answer for an already validated query text
    async fn instant_answer(&self, query: &str) -> BackendResult<InstantAnswer>;
}
