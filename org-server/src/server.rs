//! MCP stdio server.
//!
//! Reads one JSON-RPC request per line and writes one response per line.
//! Routed methods:
//! - `initialize` returns capabilities and server info
//! - `ping` returns an empty result
//! - `tools/list` enumerates registered tools
//! - `tools/call` runs a tool on the [`CallScheduler`]
//!
//! Tool calls run concurrently, so responses may be written out of request
//! order; clients correlate them by id. A `notifications/cancelled` for a
//! call still running aborts it, and no response is written for that call.

use std::collections::HashMap;
use std::sync::Arc;

use org_config::ServiceConfig;
use org_tools::{ToolError, ToolRegistry, ToolResult};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, JsonRpcResponse, METHOD_NOT_FOUND,
    PROTOCOL_VERSION, parse_request,
};
use crate::scheduler::{CallScheduler, SchedulerConfig, SchedulerError};

/// Base name announced in `serverInfo`.
pub const SERVER_NAME: &str = "AWS Organizations MCP Server";

const RESPONSE_BUFFER: usize = 64;

/// Result alias for the server loop.
pub type ServerResult<T> = Result<T, ServerError>;

/// Failures that stop the server loop.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Reading requests or writing responses failed.
    #[error("stdio transport failed: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    /// The response writer stopped unexpectedly.
    #[error("response writer stopped: {reason}")]
    WriterStopped {
        /// Why the writer ended.
        reason: String,
    },

    /// The call scheduler was closed while the server was running.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Name and version reported during `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    name: String,
    version: String,
}

impl ServerInfo {
    /// Creates server info from explicit values.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Derives server info from configuration.
    ///
    /// At debug level the name also carries the profile and region.
    #[must_use]
    pub fn for_config(config: &ServiceConfig) -> Self {
        let name = if config.is_debug() {
            format!(
                "{SERVER_NAME} (Profile: {}, Region: {})",
                config.aws_profile(),
                config.aws_region()
            )
        } else {
            SERVER_NAME.to_owned()
        };
        Self::new(name, env!("CARGO_PKG_VERSION"))
    }

    /// Returns the announced name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the announced version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Outcome of routing one request line.
enum Routed {
    Reply(JsonRpcResponse),
    Call {
        id: Value,
        name: String,
        arguments: Value,
    },
    Cancel {
        request_id: Value,
    },
    Silent,
}

/// Abort handles of running calls, keyed by the request id's JSON text.
///
/// Each entry carries a sequence number so a finished call only removes its
/// own entry when a client reuses an id.
#[derive(Default)]
struct RunningCalls {
    next: u64,
    handles: HashMap<String, (u64, AbortHandle)>,
}

impl RunningCalls {
    fn insert(&mut self, key: String, handle: AbortHandle) -> u64 {
        self.next += 1;
        self.handles.insert(key, (self.next, handle));
        self.next
    }

    fn finish(&mut self, key: &str, seq: u64) {
        if self.handles.get(key).is_some_and(|(current, _)| *current == seq) {
            self.handles.remove(key);
        }
    }

    fn cancel(&mut self, key: &str) -> bool {
        match self.handles.remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

/// MCP server exposing a [`ToolRegistry`] over newline-delimited JSON-RPC.
#[derive(Debug)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
    scheduler: CallScheduler,
}

impl McpServer {
    /// Creates a server over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, info: ServerInfo) -> Self {
        Self {
            registry,
            info,
            scheduler: CallScheduler::default(),
        }
    }

    /// Replaces the tool call concurrency limit.
    #[must_use]
    pub fn with_scheduler(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = CallScheduler::new(config);
        self
    }

    /// Returns the announced server info.
    #[must_use]
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Serves requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// Calls still running at EOF are awaited and answered before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the transport fails. Tool failures never
    /// end the loop.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> ServerResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(RESPONSE_BUFFER);
        let writer_task = tokio::spawn(write_responses(rx, writer));
        let mut in_flight: JoinSet<(String, u64)> = JoinSet::new();
        let mut running = RunningCalls::default();
        let mut lines = reader.lines();

        info!(server = self.info.name(), "serving MCP over stdio");

        while let Some(line) = lines.next_line().await? {
            while let Some(done) = in_flight.try_join_next() {
                if let Ok((key, seq)) = done {
                    running.finish(&key, seq);
                }
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.route(line) {
                Routed::Silent => {}
                Routed::Cancel { request_id } => {
                    let key = request_id.to_string();
                    if running.cancel(&key) {
                        info!(request = %key, "tool call cancelled by client");
                    } else {
                        debug!(request = %key, "cancellation for a call not running");
                    }
                }
                Routed::Reply(response) => {
                    if tx.send(response).await.is_err() {
                        break;
                    }
                }
                Routed::Call {
                    id,
                    name,
                    arguments,
                } => {
                    let registry = Arc::clone(&self.registry);
                    let call_name = name.clone();
                    let handle = self
                        .scheduler
                        .spawn(async move { registry.invoke(&call_name, arguments).await })
                        .await?;
                    let key = id.to_string();
                    let seq = running.insert(key.clone(), handle.abort_handle());
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let outcome = handle.await;
                        if outcome.as_ref().is_err_and(JoinError::is_cancelled) {
                            debug!(tool = %name, "cancelled call produces no response");
                            return (key, seq);
                        }
                        let response = call_response(id, &name, outcome);
                        if tx.send(response).await.is_err() {
                            warn!(tool = %name, "response dropped; writer stopped");
                        }
                        (key, seq)
                    });
                }
            }
        }

        while in_flight.join_next().await.is_some() {}
        drop(tx);

        match writer_task.await {
            Ok(result) => {
                result?;
                debug!("stdin closed; server loop finished");
                Ok(())
            }
            Err(err) => Err(ServerError::WriterStopped {
                reason: err.to_string(),
            }),
        }
    }

    fn route(&self, line: &str) -> Routed {
        let request = match parse_request(line) {
            Ok(request) => request,
            Err(err) => {
                debug!(?err, "rejected request line");
                return Routed::Reply(err.into_response());
            }
        };

        if let Some(request_id) = request.cancelled_request() {
            return Routed::Cancel {
                request_id: request_id.clone(),
            };
        }

        let Some(id) = request.id else {
            debug!(method = %request.method, "notification received");
            return Routed::Silent;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Routed::Reply(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                format!("unsupported jsonrpc version `{}`", request.jsonrpc),
            ));
        }

        match request.method.as_str() {
            "initialize" => Routed::Reply(JsonRpcResponse::success(id, self.initialize())),
            "ping" => Routed::Reply(JsonRpcResponse::success(id, json!({}))),
            "tools/list" => Routed::Reply(JsonRpcResponse::success(id, self.tools_list())),
            "tools/call" => Self::tools_call(id, request.params),
            method => Routed::Reply(JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        }
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": self.info.name(),
                "version": self.info.version(),
            },
        })
    }

    fn tools_list(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .list()
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    fn tools_call(id: Value, params: Option<Value>) -> Routed {
        let Some(name) = params
            .as_ref()
            .and_then(|params| params.get("name"))
            .and_then(Value::as_str)
        else {
            return Routed::Reply(JsonRpcResponse::failure(
                id,
                INVALID_PARAMS,
                "Missing 'name' in tools/call params",
            ));
        };

        let arguments = params
            .as_ref()
            .and_then(|params| params.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        Routed::Call {
            id,
            name: name.to_owned(),
            arguments,
        }
    }
}

/// Turns a finished tool call into its response.
///
/// Unknown tools and malformed arguments are protocol errors; every other
/// failure is a tool result flagged with `isError`.
fn call_response(
    id: Value,
    name: &str,
    outcome: Result<ToolResult<Value>, JoinError>,
) -> JsonRpcResponse {
    match outcome {
        Ok(Ok(value)) => JsonRpcResponse::success(id, tool_result(&value, false)),
        Ok(Err(err @ (ToolError::UnknownTool { .. } | ToolError::InvalidArguments { .. }))) => {
            JsonRpcResponse::failure(id, INVALID_PARAMS, err.to_string())
        }
        Ok(Err(err)) => {
            debug!(tool = name, kind = err.kind(), %err, "tool failed");
            JsonRpcResponse::success(id, tool_result(&err.to_payload(), true))
        }
        Err(join) => {
            error!(tool = name, %join, "tool task failed");
            let payload = json!({
                "error": "internal_error",
                "message": format!("tool `{name}` failed unexpectedly"),
            });
            JsonRpcResponse::success(id, tool_result(&payload, true))
        }
    }
}

fn tool_result(value: &Value, is_error: bool) -> Value {
    let text = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

async fn write_responses<W>(
    mut rx: mpsc::Receiver<JsonRpcResponse>,
    mut writer: W,
) -> ServerResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
