//! MCP Server implementation for web search
//!
//! This module defines the main MCP server that exposes web search tools
//! over a pluggable [`SearchBackend`]. The same tool methods back both the
//! rmcp [`ServerHandler`](rmcp::ServerHandler) and the [`ToolRegistry`]
//! used by the stdio protocol loop.

use anyhow::Result;
use mcp_common::{parse_arguments, RegistryError, RegistryResult, ToolRegistry};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::backends::{duckduckgo::DuckDuckGoBackend, SearchBackend};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::QueryError;
use crate::format::{format_instant_answer, format_results_markdown};
use crate::types::{
    normalize_query_text, InstantAnswer, ResultFormat, SearchQuery, SearchResult, SearchResults,
    MAX_QUERY_CHARS, MAX_RESULTS_LIMIT,
};

/// Order in which tools are advertised
const TOOL_ORDER: [&str; 3] = ["web_search", "instant_answer", "get_config"];

/// The main Web Search MCP Server
#[derive(Clone)]
pub struct WebSearchMcpServer {
    backend: Arc<dyn SearchBackend>,
    config: Config,
    search_cache: Option<Arc<TtlCache<Vec<SearchResult>>>>,
    answer_cache: Option<Arc<TtlCache<InstantAnswer>>>,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WebSearchParams {
    /// The search query
    #[serde(alias = "text", deserialize_with = "query_field")]
    #[schemars(with = "String", description = "The search query string (1-500 characters)")]
    pub query: String,
    /// Maximum number of results to return
    #[serde(default, deserialize_with = "max_results_field")]
    #[schemars(
        with = "Option<usize>",
        description = "Maximum number of results to return (default: 10, max: 50)"
    )]
    pub max_results: Option<usize>,
    /// Output format
    #[serde(default, deserialize_with = "format_field")]
    #[schemars(
        with = "Option<ResultFormat>",
        description = "Output format: \"json\" (default) or \"markdown\""
    )]
    pub format: Option<ResultFormat>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InstantAnswerParams {
    /// The query to look up
    #[serde(alias = "text", deserialize_with = "query_field")]
    #[schemars(with = "String", description = "The query to look up (1-500 characters)")]
    pub query: String,
    /// Output format
    #[serde(default, deserialize_with = "format_field")]
    #[schemars(
        with = "Option<ResultFormat>",
        description = "Output format: \"json\" (default) or \"markdown\""
    )]
    pub format: Option<ResultFormat>,
}

/// `get_config` takes no arguments but still requires an object
#[derive(Debug, Deserialize)]
struct GetConfigParams {}

// serde's own type errors do not say which field was wrong
fn named_field<'de, T, D>(field: &str, deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer)
        .map_err(|e| serde::de::Error::custom(format!("invalid `{field}`: {e}")))
}

fn query_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    named_field("query", deserializer)
}

fn max_results_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    named_field("max_results", deserializer)
}

fn format_field<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ResultFormat>, D::Error> {
    named_field("format", deserializer)
}

fn invalid_query(err: QueryError) -> McpError {
    McpError::invalid_params(format!("invalid `{}`: {}", err.field(), err), None)
}

/// JSON payload of the `instant_answer` tool
#[derive(Debug, Serialize)]
struct InstantAnswerOutput<'a> {
    query: &'a str,
    backend: &'a str,
    cached: bool,
    #[serde(flatten)]
    answer: &'a InstantAnswer,
}

// ============================================================================
// Tool Router Implementation
// ============================================================================

#[tool_router]
impl WebSearchMcpServer {
    /// Build a server backed by DuckDuckGo
    ///
    /// Fails only if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        tracing::info!(
            "Using DuckDuckGo backend at {} (region: {})",
            config.duckduckgo.html_base_url,
            if config.duckduckgo.region.is_empty() {
                "default"
            } else {
                config.duckduckgo.region.as_str()
            }
        );
        let backend = DuckDuckGoBackend::new(config.duckduckgo.clone(), &config.http)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Build a server over any backend
    pub fn with_backend(config: Config, backend: Arc<dyn SearchBackend>) -> Self {
        let caching = config.search.cache_enabled && config.search.cache_ttl_seconds > 0;
        let ttl = config.cache_ttl();

        if caching {
            tracing::info!("Result cache enabled (ttl: {}s)", ttl.as_secs());
        }

        Self {
            backend,
            search_cache: caching.then(|| Arc::new(TtlCache::new(ttl))),
            answer_cache: caching.then(|| Arc::new(TtlCache::new(ttl))),
            config,
            tool_router: Self::tool_router(),
        }
    }

    // ========================================================================
    // Search Tools
    // ========================================================================

    #[tool(
        description = "Search the web using DuckDuckGo. Returns titles, URLs, and snippets \
                       in ranking order. Upstream failures are reported as an error result \
                       with a kind and a retryable flag."
    )]
    async fn web_search(
        &self,
        Parameters(params): Parameters<WebSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let max_results = params.max_results.unwrap_or(self.config.search.max_results);
        let query = SearchQuery::new(&params.query, max_results).map_err(invalid_query)?;
        let format = params.format.unwrap_or(self.config.search.format);

        tracing::info!(
            "Searching for: {} (max_results: {})",
            query.text(),
            query.max_results()
        );

        let key = query.cache_key();
        let cached = match &self.search_cache {
            Some(cache) => cache.get(&key).await,
            None => None,
        };

        let (results, cached) = match cached {
            Some(results) => {
                tracing::debug!("Cache hit for: {}", query.text());
                (results, true)
            }
            None => match self.backend.search(&query).await {
                Ok(results) => {
                    if let Some(cache) = &self.search_cache {
                        cache.set(key, results.clone()).await;
                    }
                    (results, false)
                }
                Err(e) => {
                    tracing::warn!(kind = e.kind(), "Search failed: {}", e);
                    return Ok(e.to_tool_result());
                }
            },
        };

        let results = SearchResults {
            query: query.text().to_string(),
            backend: self.backend.name().to_string(),
            results,
            cached,
        };

        match format {
            ResultFormat::Json => mcp_common::json_success(&results),
            ResultFormat::Markdown => Ok(mcp_common::text_success(format_results_markdown(
                &results,
            ))),
        }
    }

    #[tool(
        description = "Look up a DuckDuckGo instant answer: a short abstract, direct answer \
                       or definition, plus related topics. Best for well-known entities \
                       and facts."
    )]
    async fn instant_answer(
        &self,
        Parameters(params): Parameters<InstantAnswerParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = normalize_query_text(&params.query).map_err(invalid_query)?;
        let format = params.format.unwrap_or(self.config.search.format);

        tracing::info!("Instant answer for: {}", text);

        let cached = match &self.answer_cache {
            Some(cache) => cache.get(&text).await,
            None => None,
        };

        let (answer, cached) = match cached {
            Some(answer) => (answer, true),
            None => match self.backend.instant_answer(&text).await {
                Ok(answer) => {
                    if let Some(cache) = &self.answer_cache {
                        cache.set(text.clone(), answer.clone()).await;
                    }
                    (answer, false)
                }
                Err(e) => {
                    tracing::warn!(kind = e.kind(), "Instant answer failed: {}", e);
                    return Ok(e.to_tool_result());
                }
            },
        };

        match format {
            ResultFormat::Json => mcp_common::json_success(&InstantAnswerOutput {
                query: &text,
                backend: self.backend.name(),
                cached,
                answer: &answer,
            }),
            ResultFormat::Markdown => Ok(mcp_common::text_success(format_instant_answer(
                &text, &answer,
            ))),
        }
    }

    #[tool(description = "Get the current search backend configuration and limits.")]
    async fn get_config(&self) -> Result<CallToolResult, McpError> {
        #[derive(Serialize)]
        struct ConfigStatus<'a> {
            backend: &'a str,
            region: &'a str,
            default_max_results: usize,
            max_results_limit: usize,
            max_query_chars: usize,
            default_format: ResultFormat,
            timeout_seconds: u64,
            call_timeout_seconds: u64,
            user_agent: &'a str,
            rate_limit_ms: u64,
            cache_enabled: bool,
            cache_ttl_seconds: u64,
            max_concurrency: usize,
        }

        let config = &self.config;
        let status = ConfigStatus {
            backend: self.backend.name(),
            region: &config.duckduckgo.region,
            default_max_results: config.search.max_results.min(MAX_RESULTS_LIMIT),
            max_results_limit: MAX_RESULTS_LIMIT,
            max_query_chars: MAX_QUERY_CHARS,
            default_format: config.search.format,
            timeout_seconds: config.http.timeout_seconds,
            call_timeout_seconds: config.call_timeout().as_secs(),
            user_agent: &config.http.user_agent,
            rate_limit_ms: config.http.rate_limit_ms,
            cache_enabled: self.search_cache.is_some(),
            cache_ttl_seconds: config.search.cache_ttl_seconds,
            max_concurrency: config.server.max_concurrency,
        };

        mcp_common::json_success(&status)
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for WebSearchMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Web Search MCP Server - provides tools for searching the web using \
                 DuckDuckGo. Use web_search for ranked web results and instant_answer \
                 for quick facts. No API keys required."
                    .into(),
            ),
            server_info: Implementation {
                name: "websearch-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tool Registry Implementation
// ============================================================================

#[async_trait::async_trait]
impl ToolRegistry for WebSearchMcpServer {
    fn server_info(&self) -> ServerInfo {
        rmcp::ServerHandler::get_info(self)
    }

    fn list_tools(&self) -> Vec<Tool> {
        let mut tools = self.tool_router.list_all();
        tools.sort_by_key(|t| {
            TOOL_ORDER
                .iter()
                .position(|name| *name == t.name)
                .unwrap_or(TOOL_ORDER.len())
        });
        tools
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> RegistryResult<CallToolResult> {
        let result = match name {
            "web_search" => {
                let params: WebSearchParams = parse_arguments(name, arguments)?;
                self.web_search(Parameters(params)).await
            }

            "instant_answer" => {
                let params: InstantAnswerParams = parse_arguments(name, arguments)?;
                self.instant_answer(Parameters(params)).await
            }

            "get_config" => {
                let _: GetConfigParams = parse_arguments(name, arguments)?;
                self.get_config().await
            }

            _ => return Err(RegistryError::ToolNotFound(name.to_string())),
        };

        result.map_err(|e| RegistryError::from_mcp(name, e))
    }
}
