//! Web Search MCP Library
//!
//! Web search via DuckDuckGo, exposed as MCP tools.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use websearch_mcp::{Config, WebSearchMcpServer};
//! use mcp_common::{serve_stdio, ServeOptions};
//!
//! let config = Config::load(None)?;
//! let server = WebSearchMcpServer::new(config)?;
//! serve_stdio(server, ServeOptions::default()).await?;
//! ```
//!
//! # Configuration
//! See [`config`]; `WEBSEARCH_*` env vars override `~/.websearch-mcp/config.toml`.

pub mod backends;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod rate_limit;
pub mod server;
pub mod types;

// Re-export main server type
pub use server::WebSearchMcpServer;

// Re-export parameter types for direct API usage
pub use server::{InstantAnswerParams, WebSearchParams};

pub use config::Config;
pub use error::{QueryError, SearchError};
pub use types::{InstantAnswer, ResultFormat, SearchQuery, SearchResult, SearchResults};
