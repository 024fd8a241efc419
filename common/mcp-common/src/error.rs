//! Error helpers for MCP servers
//!
//! Every error that crosses the protocol boundary is an rmcp [`ErrorData`]
//! (re-exported as `McpError`). These constructors cover the JSON-RPC 2.0
//! codes the stdio loop and the tool implementations emit.

use rmcp::model::ErrorCode;
use rmcp::ErrorData as McpError;
use serde_json::Value;

/// The frame was not valid JSON (-32700)
pub fn parse_error(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::PARSE_ERROR, message.into(), None)
}

/// The frame was JSON but not a valid request, or arrived in the wrong state (-32600)
pub fn invalid_request(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::INVALID_REQUEST, message.into(), None)
}

/// No handler for the requested method (-32601)
pub fn method_not_found(method: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("method not found: {method}"),
        Some(serde_json::json!({ "method": method })),
    )
}

/// Create an invalid params error with a message (-32602)
///
/// Use this when a tool receives arguments it cannot accept.
///
/// ```rust,ignore
/// if query.trim().is_empty() {
///     return Err(invalid_params("query: must not be empty"));
/// }
/// ```
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}

/// Like [`invalid_params`], with structured context attached
pub fn invalid_params_with(message: impl Into<String>, data: Value) -> McpError {
    McpError::invalid_params(message.into(), Some(data))
}

/// Create an internal error with a message (-32603)
pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

/// Whether the error reports bad caller input rather than a server fault
pub fn is_invalid_params(err: &McpError) -> bool {
    err.code.0 == ErrorCode::INVALID_PARAMS.0
}
