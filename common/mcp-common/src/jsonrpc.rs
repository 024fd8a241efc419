//! JSON-RPC 2.0 framing for the MCP stdio transport
//!
//! One message per line. Incoming lines are classified into requests,
//! notifications and (ignored) client responses; anything else is a
//! [`FrameError`] that still produces a response, correlated to the request
//! id whenever the id could be read.

use rmcp::ErrorData as McpError;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{invalid_request, parse_error};

pub const JSONRPC_VERSION: &str = "2.0";

/// A well-formed incoming message
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Expects exactly one response carrying `id`
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    /// Fire-and-forget, never answered
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// A response from the client; this server never issues requests
    Response,
}

/// A line that could not be accepted as a JSON-RPC message
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {reason}")]
    Invalid { id: Option<Value>, reason: String },
}

impl FrameError {
    fn invalid(id: Option<Value>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            id,
            reason: reason.into(),
        }
    }

    /// Id to answer with: the request's own when readable, `null` otherwise
    pub fn response_id(&self) -> Value {
        match self {
            Self::Invalid { id: Some(id), .. } => id.clone(),
            _ => Value::Null,
        }
    }

    pub fn to_mcp_error(&self) -> McpError {
        match self {
            Self::Parse(_) => parse_error(self.to_string()),
            Self::Invalid { .. } => invalid_request(self.to_string()),
        }
    }

    pub fn into_response(self) -> Response {
        Response::error(self.response_id(), self.to_mcp_error())
    }
}

/// Decode one line into an [`Incoming`] message
pub fn decode_frame(line: &str) -> Result<Incoming, FrameError> {
    let value: Value = serde_json::from_str(line).map_err(|e| FrameError::Parse(e.to_string()))?;

    let mut frame = match value {
        Value::Object(map) => map,
        Value::Array(_) => {
            return Err(FrameError::invalid(None, "batch requests are not supported"))
        }
        _ => return Err(FrameError::invalid(None, "message must be a JSON object")),
    };

    // Client responses are dropped whatever their id, even `null`
    if !frame.contains_key("method") && (frame.contains_key("result") || frame.contains_key("error"))
    {
        return Ok(Incoming::Response);
    }

    let id = read_id(&mut frame)?;

    match frame.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => return Err(FrameError::invalid(id, "jsonrpc must be \"2.0\"")),
    }

    let method = match frame.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => return Err(FrameError::invalid(id, "method must be a string")),
        None => return Err(FrameError::invalid(id, "missing method")),
    };

    let params = frame.remove("params");
    Ok(match id {
        Some(id) => Incoming::Request { id, method, params },
        None => Incoming::Notification { method, params },
    })
}

fn read_id(frame: &mut Map<String, Value>) -> Result<Option<Value>, FrameError> {
    match frame.remove("id") {
        None => Ok(None),
        Some(id @ (Value::String(_) | Value::Number(_))) => Ok(Some(id)),
        Some(_) => Err(FrameError::invalid(None, "id must be a string or a number")),
    }
}

/// An outgoing response
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(McpError),
}

impl Response {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: Value, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Error(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}
