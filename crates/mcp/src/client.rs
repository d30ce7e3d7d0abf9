//! Client for a tool server running as a subprocess.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::call::ToolCall;
use crate::error::{Error, Result};
use crate::executor::{ToolError, ToolExecutor};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, Tool,
};

/// Default timeout for a request to the server.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum size of one response line (1MB).
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// How to launch a tool server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            name: command.clone(),
            command,
            args: Vec::new(),
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Server output plus any partial line left by a read that timed out.
struct ResponseReader {
    stdout: BufReader<ChildStdout>,
    pending: Vec<u8>,
}

/// Handle to a running tool server.
pub struct Client {
    config: ClientConfig,
    process: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    reader: Mutex<ResponseReader>,
    next_id: AtomicI64,
    server_info: Mutex<Option<InitializeResult>>,
    tools: Mutex<Vec<Tool>>,
}

impl Client {
    /// Spawn the server process. Call [`Client::initialize`] before use.
    pub async fn spawn(config: ClientConfig) -> Result<Self> {
        let mut process = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let stdin = process.stdin.take().ok_or_else(|| Error::Spawn {
            command: config.command.clone(),
            source: std::io::Error::other("failed to capture stdin"),
        })?;
        let stdout = process.stdout.take().ok_or_else(|| Error::Spawn {
            command: config.command.clone(),
            source: std::io::Error::other("failed to capture stdout"),
        })?;

        debug!(server = %config.name, "spawned tool server");
        Ok(Self {
            config,
            process: Mutex::new(process),
            stdin: Mutex::new(stdin),
            reader: Mutex::new(ResponseReader {
                stdout: BufReader::new(stdout),
                pending: Vec::new(),
            }),
            next_id: AtomicI64::new(1),
            server_info: Mutex::new(None),
            tools: Mutex::new(Vec::new()),
        })
    }

    /// Spawn and initialize in one step.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::spawn(config).await?;
        client.initialize().await?;
        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Perform the initialize handshake and fetch the tool list.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let result: InitializeResult = self
            .request("initialize", Some(InitializeParams::default()))
            .await?;
        self.notify("notifications/initialized").await?;

        info!(
            server = %result.server_info.name,
            protocol = %result.protocol_version,
            "connected to tool server"
        );
        *self.server_info.lock().await = Some(result.clone());

        self.refresh_tools().await?;
        Ok(result)
    }

    pub async fn is_initialized(&self) -> bool {
        self.server_info.lock().await.is_some()
    }

    pub async fn server_info(&self) -> Option<InitializeResult> {
        self.server_info.lock().await.clone()
    }

    pub async fn refresh_tools(&self) -> Result<()> {
        let result: ListToolsResult = self.request("tools/list", None::<()>).await?;
        *self.tools.lock().await = result.tools;
        Ok(())
    }

    /// Tools reported by the last `tools/list`.
    pub async fn tools(&self) -> Vec<Tool> {
        self.tools.lock().await.clone()
    }

    /// Call a tool. A result flagged `isError` is returned as-is, not as `Err`.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult> {
        if !self.is_initialized().await {
            return Err(Error::NotInitialized);
        }

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        self.request("tools/call", Some(params)).await
    }

    /// Send a raw request and return the full response envelope.
    ///
    /// Replies still in flight from earlier requests that timed out are
    /// skipped. A timeout fails only this request.
    pub async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        // One exchange at a time: the write and its reply under one lock.
        let mut reader = self.reader.lock().await;
        self.write_line(&serde_json::to_string(request)?).await?;
        timeout(
            self.config.timeout,
            read_reply(&mut reader, request.id.as_ref()),
        )
        .await
        .map_err(|_| Error::Timeout)?
    }

    pub async fn is_running(&self) -> bool {
        let mut process = self.process.lock().await;
        matches!(process.try_wait(), Ok(None))
    }

    /// Close the server's input and stop the process.
    pub async fn shutdown(self) -> Result<()> {
        let Self { stdin, process, .. } = self;
        drop(stdin);

        let mut process = process.into_inner();
        if timeout(Duration::from_secs(2), process.wait()).await.is_err() {
            process.kill().await?;
        }
        Ok(())
    }

    // --- Internal methods ---

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(p) = params {
            request = request.with_params(p);
        }

        let response = self.send(&request).await?;
        if response.id.as_ref() != Some(&id) {
            return Err(Error::InvalidResponse(format!(
                "response ID mismatch: expected {id:?}, got {:?}",
                response.id
            )));
        }

        let value = response.into_result()?;
        Ok(serde_json::from_value(value)?)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let notification = JsonRpcRequest::notification(method);
        self.write_line(&serde_json::to_string(&notification)?).await
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }
}

/// Read responses until the one answering `id` arrives.
async fn read_reply(
    reader: &mut ResponseReader,
    id: Option<&RequestId>,
) -> Result<JsonRpcResponse> {
    loop {
        let response = read_response(reader).await?;
        match (response.id.as_ref(), id) {
            (Some(got), Some(expected)) if got != expected => {
                debug!(?got, ?expected, "dropping stale response");
            }
            _ => return Ok(response),
        }
    }
}

/// Read one response line. A partial line survives cancellation in
/// `pending` and is completed by the next read.
async fn read_response(reader: &mut ResponseReader) -> Result<JsonRpcResponse> {
    let ResponseReader { stdout, pending } = reader;
    let bytes_read = stdout.read_until(b'\n', pending).await?;
    let line = std::mem::take(pending);
    if bytes_read == 0 && line.is_empty() {
        return Err(Error::ServerExited);
    }

    if line.len() > MAX_OUTPUT_SIZE {
        return Err(Error::OutputTooLarge {
            size: line.len(),
            max: MAX_OUTPUT_SIZE,
        });
    }

    Ok(serde_json::from_slice(&line)?)
}

impl ToolExecutor for Client {
    async fn execute(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
        self.call_tool(&call.name, Some(call.arguments.to_json()))
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?
            .into_text()
    }
}
