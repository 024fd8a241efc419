//! Stdio protocol loop for MCP servers
//!
//! Reads newline-delimited JSON-RPC from an input stream, drives the session
//! lifecycle and writes one response line per request. Tool calls run as
//! separate tasks (bounded by a semaphore) so a slow upstream does not block
//! `ping` or other calls; a single writer task owns the output so response
//! lines never interleave. Responses may leave in a different order than
//! their requests arrived; each one carries its request's id.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized --initialize--> Ready --tools/list, tools/call--> Ready
//!                                Ready --shutdown | end of input--> Terminated
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use rmcp::model::{ProtocolVersion, Tool};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::error::{internal_error, invalid_params, invalid_request, method_not_found};
use crate::jsonrpc::{decode_frame, Incoming, Response};
use crate::registry::ToolRegistry;

/// Outgoing responses buffered between dispatch and the writer task
const RESPONSE_BUFFER: usize = 64;

/// Protocol revisions a client may select during initialize
const PROTOCOL_VERSIONS: [ProtocolVersion; 3] = [
    ProtocolVersion::V_2025_06_18,
    ProtocolVersion::V_2025_03_26,
    ProtocolVersion::V_2024_11_05,
];

/// Tuning for the protocol loop
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Maximum number of tool calls running at once
    pub max_concurrency: usize,
    /// Upper bound on a single tool call, after which it is aborted
    pub call_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// What to do with a request after inspecting it
enum Dispatch {
    Reply(Response),
    Invoke {
        id: Value,
        name: String,
        arguments: Value,
    },
}

/// One client session over a pair of byte streams
pub struct ProtocolServer<R: ToolRegistry> {
    registry: Arc<R>,
    tools: Arc<Vec<Tool>>,
    options: ServeOptions,
    state: SessionState,
}

impl<R: ToolRegistry> ProtocolServer<R> {
    pub fn new(registry: Arc<R>, options: ServeOptions) -> Self {
        // The tool table is fixed for the life of the process
        let tools = Arc::new(registry.list_tools());
        let options = ServeOptions {
            max_concurrency: options.max_concurrency.max(1),
            ..options
        };

        Self {
            registry,
            tools,
            options,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session until shutdown or end of input
    ///
    /// Returns once every accepted tool call has answered and the output has
    /// been flushed. Errors are limited to I/O failures on the streams.
    pub async fn serve<I, O>(mut self, input: I, output: O) -> anyhow::Result<()>
    where
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Response>(RESPONSE_BUFFER);
        let writer = tokio::spawn(write_responses(output, rx));

        let permits = Arc::new(Semaphore::new(self.options.max_concurrency));
        let mut inflight = JoinSet::new();
        let mut lines = BufReader::new(input).lines();

        tracing::info!(
            tools = self.tools.len(),
            max_concurrency = self.options.max_concurrency,
            "Protocol server waiting for requests"
        );

        while self.state != SessionState::Terminated {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Tool call task failed: {}", e);
                    }
                    continue;
                }
            };

            let Some(line) = line else {
                tracing::info!("End of input, terminating session");
                self.state = SessionState::Terminated;
                break;
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let dispatch = match decode_frame(line) {
                Ok(Incoming::Request { id, method, params }) => {
                    self.handle_request(id, &method, params)
                }
                Ok(Incoming::Notification { method, params }) => {
                    self.handle_notification(&method, params.as_ref());
                    continue;
                }
                Ok(Incoming::Response) => {
                    tracing::debug!("Ignoring response frame from client");
                    continue;
                }
                Err(frame_error) => {
                    tracing::warn!(state = %self.state, "Rejected frame: {}", frame_error);
                    Dispatch::Reply(frame_error.into_response())
                }
            };

            match dispatch {
                Dispatch::Reply(response) => {
                    if tx.send(response).await.is_err() {
                        anyhow::bail!("output closed while the session was active");
                    }
                }
                Dispatch::Invoke {
                    id,
                    name,
                    arguments,
                } => {
                    let permit = Arc::clone(&permits).acquire_owned().await?;
                    let registry = Arc::clone(&self.registry);
                    let tx = tx.clone();
                    let call_timeout = self.options.call_timeout;
                    inflight.spawn(async move {
                        let response =
                            invoke(registry, id, name, arguments, call_timeout, permit).await;
                        if tx.send(response).await.is_err() {
                            tracing::warn!("Output closed before a tool response could be sent");
                        }
                    });
                }
            }
        }

        while let Some(joined) = inflight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Tool call task failed: {}", e);
            }
        }

        drop(tx);
        writer.await??;

        tracing::info!("Session terminated");
        Ok(())
    }

    fn handle_request(&mut self, id: Value, method: &str, params: Option<Value>) -> Dispatch {
        tracing::debug!(method, %id, state = %self.state, "Request");

        match method {
            "ping" => return Dispatch::Reply(Response::result(id, json!({}))),
            "initialize" => return Dispatch::Reply(self.initialize(id, params.as_ref())),
            "shutdown" => {
                tracing::info!("Shutdown requested");
                self.state = SessionState::Terminated;
                return Dispatch::Reply(Response::result(id, json!({})));
            }
            _ => {}
        }

        if self.state != SessionState::Ready {
            return Dispatch::Reply(Response::error(
                id,
                invalid_request(format!("server not initialized: {method} requires initialize")),
            ));
        }

        match method {
            "tools/list" => {
                let tools = json!({ "tools": self.tools.as_slice() });
                Dispatch::Reply(Response::result(id, tools))
            }
            "tools/call" => {
                let params = params.unwrap_or(Value::Null);
                match serde_json::from_value::<CallToolParams>(params) {
                    Ok(call) => Dispatch::Invoke {
                        id,
                        name: call.name,
                        arguments: call.arguments.unwrap_or(Value::Null),
                    },
                    Err(e) => Dispatch::Reply(Response::error(
                        id,
                        invalid_params(format!("tools/call params: {e}")),
                    )),
                }
            }
            _ => Dispatch::Reply(Response::error(id, method_not_found(method))),
        }
    }

    fn initialize(&mut self, id: Value, params: Option<&Value>) -> Response {
        if self.state != SessionState::Uninitialized {
            return Response::error(id, invalid_request("server already initialized"));
        }

        let client = params
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or("unspecified");

        let mut info = self.registry.server_info();
        if let Some(version) = PROTOCOL_VERSIONS
            .into_iter()
            .find(|v| v.to_string() == requested)
        {
            info.protocol_version = version;
        }
        let version = info.protocol_version.to_string();

        match serde_json::to_value(info) {
            Ok(info) => {
                tracing::info!(
                    client,
                    requested_version = requested,
                    version = version.as_str(),
                    "Session initialized"
                );
                self.state = SessionState::Ready;
                Response::result(id, info)
            }
            Err(e) => Response::error(id, internal_error(format!("server info: {e}"))),
        }
    }

    fn handle_notification(&self, method: &str, params: Option<&Value>) {
        match method {
            "notifications/initialized" => {
                tracing::debug!("Client finished initialization");
            }
            "notifications/cancelled" => {
                let request_id = params.and_then(|p| p.get("requestId"));
                tracing::debug!(?request_id, "Client cancelled a request");
            }
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }
}

/// Run one tool call and turn every outcome into a response for `id`
async fn invoke<R: ToolRegistry>(
    registry: Arc<R>,
    id: Value,
    name: String,
    arguments: Value,
    call_timeout: Duration,
    _permit: OwnedSemaphorePermit,
) -> Response {
    let started = Instant::now();
    let tool = name.clone();

    // A nested task turns a panicking tool into a JoinError instead of a lost response
    let handle = tokio::spawn(async move { registry.call_tool(&tool, arguments).await });
    let abort = handle.abort_handle();

    let response = match tokio::time::timeout(call_timeout, handle).await {
        Ok(Ok(Ok(result))) => match serde_json::to_value(&result) {
            Ok(value) => Response::result(id, value),
            Err(e) => Response::error(id, internal_error(format!("tool result: {e}"))),
        },
        Ok(Ok(Err(err))) => Response::error(id, err.into_mcp_error()),
        Ok(Err(join_error)) => {
            Response::error(id, internal_error(format!("tool {name} failed: {join_error}")))
        }
        Err(_) => {
            abort.abort();
            Response::error(
                id,
                internal_error(format!(
                    "tool {name} timed out after {}s",
                    call_timeout.as_secs_f64()
                )),
            )
        }
    };

    tracing::info!(
        tool = %name,
        elapsed_ms = started.elapsed().as_millis() as u64,
        error = response.is_error(),
        "Tool call finished"
    );
    response
}

async fn write_responses<O>(mut output: O, mut rx: mpsc::Receiver<Response>) -> std::io::Result<()>
where
    O: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(id = %response.id, "Failed to serialize response: {}", e);
                continue;
            }
        };
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    output.shutdown().await
}

/// Serve a registry over this process's stdin/stdout
pub async fn serve_stdio<R: ToolRegistry>(registry: R, options: ServeOptions) -> anyhow::Result<()> {
    ProtocolServer::new(Arc::new(registry), options)
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await
}
