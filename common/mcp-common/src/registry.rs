//! Tool registry contract
//!
//! [`ToolRegistry`] is the seam between the stdio protocol loop and a concrete
//! MCP server. The loop only ever asks three things: who the server is, which
//! tools it has, and to run one of them.
//!
//! Servers built on rmcp's `#[tool_router]` implement it by delegating to
//! their router for the listing and calling their tool methods directly:
//!
//! ```rust,ignore
//! #[async_trait]
//! impl ToolRegistry for MyServer {
//!     fn server_info(&self) -> ServerInfo {
//!         rmcp::ServerHandler::get_info(self)
//!     }
//!
//!     fn list_tools(&self) -> Vec<Tool> {
//!         self.tool_router.list_all()
//!     }
//!
//!     async fn call_tool(&self, name: &str, arguments: Value) -> RegistryResult<CallToolResult> {
//!         match name {
//!             "echo" => {
//!                 let params = parse_arguments(name, arguments)?;
//!                 self.echo(Parameters(params)).await.map_err(|e| RegistryError::from_mcp(name, e))
//!             }
//!             _ => Err(RegistryError::ToolNotFound(name.to_string())),
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, ServerInfo, Tool};
use rmcp::ErrorData as McpError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{internal_error, invalid_params_with, is_invalid_params};

/// Errors raised while resolving or running a tool call
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No tool with this name is registered
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The arguments do not match the tool's declared schema
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// Tool the arguments were meant for
        tool: String,
        /// Human readable description naming the offending field
        reason: String,
    },

    /// The tool itself failed in a way it could not report as a result
    #[error("tool execution failed: {0}")]
    Execution(String),
}

impl RegistryError {
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Classify an error returned by an rmcp tool method
    pub fn from_mcp(tool: &str, err: McpError) -> Self {
        if is_invalid_params(&err) {
            Self::invalid_arguments(tool, err.message.to_string())
        } else {
            Self::Execution(err.message.to_string())
        }
    }

    /// Wire representation for a JSON-RPC error response
    pub fn into_mcp_error(self) -> McpError {
        match self {
            Self::ToolNotFound(ref tool) => {
                let data = serde_json::json!({ "tool": tool });
                invalid_params_with(self.to_string(), data)
            }
            Self::InvalidArguments { ref tool, .. } => {
                let data = serde_json::json!({ "tool": tool });
                invalid_params_with(self.to_string(), data)
            }
            Self::Execution(message) => internal_error(message),
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A fixed set of invocable tools
///
/// Implementations must be `Send + Sync`: calls may run concurrently on
/// separate tasks against the same registry.
#[async_trait]
pub trait ToolRegistry: Send + Sync + 'static {
    /// Initialization payload: protocol version, capabilities, server identity
    fn server_info(&self) -> ServerInfo;

    /// Descriptors of every tool, in a stable order
    fn list_tools(&self) -> Vec<Tool>;

    /// Run the named tool with the given JSON arguments
    ///
    /// Failures the tool can describe (upstream errors and the like) are
    /// returned as `Ok` results with the error flag set. `Err` is reserved
    /// for unknown tools, bad arguments and faults.
    async fn call_tool(&self, name: &str, arguments: Value) -> RegistryResult<CallToolResult>;
}

/// Decode tool arguments into their parameter type
///
/// Absent arguments (`null`) are treated as an empty object so tools whose
/// fields are all optional accept a bare call.
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> RegistryResult<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        Value::Object(map) => Value::Object(map),
        other => {
            return Err(RegistryError::invalid_arguments(
                tool,
                format!("arguments must be a JSON object, got {}", json_type(&other)),
            ))
        }
    };

    serde_json::from_value(arguments)
        .map_err(|e| RegistryError::invalid_arguments(tool, e.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
