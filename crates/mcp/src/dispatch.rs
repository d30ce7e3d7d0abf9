//! JSON-RPC dispatch core: one request per line in, one response per line out.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::call::{Arguments, ToolCall};
use crate::error::{Error, Result};
use crate::executor::{ToolError, ToolExecutor};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, PeerInfo, RequestId, ServerCapabilities,
    ToolsCapability,
};
use crate::registry::ToolRegistry;

/// Default bound on a single tool execution.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on one request line (1MB), newline excluded.
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Settings for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub server_name: String,
    pub server_version: String,
    pub tool_timeout: Duration,
    /// Longer request lines are answered with a parse error and skipped.
    pub max_request_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            server_name: "mac-apps-mcp-server".to_string(),
            server_version: "1.0.0".to_string(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            max_request_size: MAX_REQUEST_SIZE,
        }
    }
}

/// Routes JSON-RPC requests to the registry and a tool executor.
///
/// Requests are handled one at a time; the registry is the only state
/// shared between them.
pub struct Dispatcher<E> {
    registry: Arc<ToolRegistry>,
    executor: Arc<E>,
    config: DispatchConfig,
}

impl<E: ToolExecutor + 'static> Dispatcher<E> {
    pub fn new(registry: Arc<ToolRegistry>, executor: E) -> Self {
        Self {
            registry,
            executor: Arc::new(executor),
            config: DispatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Fixed capability descriptor. Calling it again returns the same value.
    pub fn initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            server_info: PeerInfo {
                name: self.config.server_name.clone(),
                version: Some(self.config.server_version.clone()),
            },
        }
    }

    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.registry.tools(),
        }
    }

    /// Run one tool.
    ///
    /// Tool failures come back as an error result. `Err` is reserved for
    /// faults in the dispatch machinery itself, such as a panicking executor.
    pub async fn invoke(&self, name: &str, arguments: Arguments) -> Result<CallToolResult> {
        let Some(descriptor) = self.registry.describe(name) else {
            warn!(tool = %name, "call to unknown tool");
            return Ok(CallToolResult::error(ToolError::NotFound(name.to_string())));
        };

        let arguments = match descriptor.validate(arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %name, error = %e, "rejected tool arguments");
                return Ok(CallToolResult::error(e));
            }
        };

        info!(tool = %name, "calling tool");
        let call = ToolCall::new(descriptor.name.clone(), arguments);
        let executor = Arc::clone(&self.executor);
        let limit = self.config.tool_timeout;
        let task = tokio::spawn(async move { timeout(limit, executor.execute(&call)).await });

        let outcome = task
            .await
            .map_err(|e| Error::Internal(format!("tool {name} aborted: {e}")))?;

        Ok(match outcome {
            Ok(Ok(text)) => CallToolResult::text(text),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "tool failed");
                CallToolResult::error(e)
            }
            Err(_) => {
                let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                warn!(tool = %name, timeout_ms = millis, "tool timed out");
                CallToolResult::error(ToolError::Timeout(millis))
            }
        })
    }

    /// Handle one input line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                return Some(JsonRpcResponse::failure(None, JsonRpcError::parse_error(e)));
            }
        };

        match serde_json::from_value::<JsonRpcRequest>(value.clone()) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                let id = value
                    .get("id")
                    .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
                Some(JsonRpcResponse::failure(id, JsonRpcError::invalid_request(e)))
            }
        }
    }

    /// Handle one parsed request.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "request");

        if request.is_notification() && request.method.starts_with("notifications/") {
            return None;
        }

        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            "initialize" => serde_json::to_value(self.initialize()).map_err(Error::from),
            "tools/list" => serde_json::to_value(self.list_tools()).map_err(Error::from),
            "tools/call" => self.call_tool(request.params).await,
            other => {
                warn!(method = %other, "unknown method");
                return Some(JsonRpcResponse::failure(
                    id,
                    JsonRpcError::method_not_found(other),
                ));
            }
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                warn!(error = %e, "internal fault");
                JsonRpcResponse::failure(id, JsonRpcError::internal_error(e))
            }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value> {
        let result = match serde_json::from_value::<CallToolParams>(params.unwrap_or(Value::Null)) {
            Err(e) => CallToolResult::error(format!("invalid params: {e}")),
            Ok(params) => match params.arguments {
                None | Some(Value::Null) => self.invoke(&params.name, Arguments::new()).await?,
                Some(value) => match Arguments::from_json(value) {
                    Some(arguments) => self.invoke(&params.name, arguments).await?,
                    None => CallToolResult::error(ToolError::InvalidInput(
                        "arguments must be an object".to_string(),
                    )),
                },
            },
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Serve requests until the input stream ends.
    ///
    /// Each response is written as one line and flushed. A bad line yields
    /// an error response and the loop moves on to the next one.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            server = %self.config.server_name,
            tools = self.registry.len(),
            "serving requests"
        );

        let limit = self.config.max_request_size;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = (&mut reader)
                .take(limit as u64 + 1)
                .read_until(b'\n', &mut buf)
                .await?;
            if read == 0 {
                break;
            }

            let oversized = buf.len() > limit && buf.last() != Some(&b'\n');
            let response = if oversized {
                skip_line(&mut reader).await?;
                warn!(limit, "request line too large");
                Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::parse_error(format!("request line exceeds {limit} bytes")),
                ))
            } else {
                self.respond_to(&buf).await
            };

            if let Some(response) = response {
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                writer.write_all(&out).await?;
                writer.flush().await?;
            }
        }

        info!("input closed, stopping");
        Ok(())
    }

    async fn respond_to(&self, buf: &[u8]) -> Option<JsonRpcResponse> {
        match std::str::from_utf8(buf) {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => self.handle_line(line.trim()).await,
            Err(e) => Some(JsonRpcResponse::failure(None, JsonRpcError::parse_error(e))),
        }
    }
}

/// Drop the rest of the current line without buffering it.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

impl<E: ToolExecutor + 'static> ToolExecutor for Dispatcher<E> {
    async fn execute(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
        self.invoke(&call.name, call.arguments.clone())
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?
            .into_text()
    }
}
