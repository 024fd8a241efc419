//! MCP Common - Shared plumbing for MCP servers
//!
//! This crate provides the domain-free half of an MCP server:
//!
//! - **Protocol**: [`ProtocolServer`], a newline-delimited JSON-RPC 2.0 loop
//!   over any async byte streams, with [`serve_stdio`] for the usual case
//! - **Registry**: the [`ToolRegistry`] trait a server implements to be served
//! - **Results**: helpers for creating `CallToolResult` responses
//! - **Errors**: JSON-RPC error constructors built on rmcp's `ErrorData`
//! - **Init**: tracing setup and [`FatalError`] exit codes
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{init_tracing, serve_stdio, LogFormat, ServeOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing("my_mcp", LogFormat::Text)?;
//!     serve_stdio(MyServer::new(), ServeOptions::default()).await
//! }
//! ```

pub mod error;
pub mod init;
pub mod jsonrpc;
pub mod registry;
pub mod result;
pub mod server;

// Re-export commonly used items at crate root
pub use error::{internal_error, invalid_params};
pub use init::{init_tracing, FatalError, LogFormat};
pub use registry::{parse_arguments, RegistryError, RegistryResult, ToolRegistry};
pub use result::{first_text, json_error, json_success, text_success};
pub use server::{serve_stdio, ProtocolServer, ServeOptions, SessionState};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, ServerInfo, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing ToolRegistry
pub use async_trait::async_trait;
