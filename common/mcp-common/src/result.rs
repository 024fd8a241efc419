//! Result helpers for MCP tool responses
//!
//! A tool call either succeeds with content or fails *inside* the tool
//! (`isError: true`). Tool-level failures are ordinary results so the
//! calling model can read them; only protocol faults become JSON-RPC errors.

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

/// Create a successful JSON response from any serializable data
///
/// The payload is pretty-printed into a single text content item.
///
/// ```rust,ignore
/// fn get_config(&self) -> Result<CallToolResult, McpError> {
///     json_success(&self.status())
/// }
/// ```
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Create a successful plain text response
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Create a tool-level failure carrying a JSON description of what went wrong
///
/// A payload that fails to serialize degrades to a minimal error object.
pub fn json_error<T: Serialize>(data: &T) -> CallToolResult {
    let json = serde_json::to_string_pretty(data).unwrap_or_else(|e| {
        serde_json::json!({ "error": { "message": e.to_string() } }).to_string()
    });
    CallToolResult::error(vec![Content::text(json)])
}

/// Text of the first text content item, if any
pub fn first_text(result: &CallToolResult) -> Option<&str> {
    result
        .content
        .first()
        .and_then(|c| c.raw.as_text())
        .map(|t| t.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_json_success() {
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };
        let result = json_success(&data).unwrap();
        assert!(!result.is_error.unwrap_or(false));
        let text = first_text(&result).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["value"], 42);
    }

    #[test]
    fn test_text_success() {
        let result = text_success("hello world");
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(first_text(&result), Some("hello world"));
    }

    #[test]
    fn test_json_error_sets_error_flag() {
        let result = json_error(&serde_json::json!({ "error": { "kind": "network" } }));
        assert_eq!(result.is_error, Some(true));
        assert!(first_text(&result).unwrap().contains("network"));
    }
}
