//! Tool protocol core: JSON-RPC types, the tool registry and the dispatch loop.
//!
//! The dispatch side reads one JSON-RPC request per line, looks the tool up
//! in an immutable [`ToolRegistry`], runs it through a [`ToolExecutor`] and
//! writes one response per line. The client side drives such a server as a
//! subprocess and is itself a [`ToolExecutor`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mcp::{
//!     Dispatcher, ParamType, ParameterSpec, ToolCall, ToolDescriptor, ToolError, ToolExecutor,
//!     ToolRegistry,
//! };
//!
//! struct Echo;
//!
//! impl ToolExecutor for Echo {
//!     async fn execute(&self, call: &ToolCall) -> Result<String, ToolError> {
//!         Ok(call.arguments.get_str("text").unwrap_or_default().to_string())
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! let registry = ToolRegistry::new(vec![
//!     ToolDescriptor::new("echo", "Echoes its input")
//!         .param(ParameterSpec::required("text", ParamType::String, "Text to echo")),
//! ])?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(registry), Echo);
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! dispatcher.serve(stdin, tokio::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

mod call;
mod client;
mod dispatch;
mod error;
mod executor;
mod protocol;
mod registry;

pub use call::{ArgValue, Arguments, ToolCall};
pub use client::{Client, ClientConfig, DEFAULT_TIMEOUT, MAX_OUTPUT_SIZE};
pub use dispatch::{DEFAULT_TOOL_TIMEOUT, DispatchConfig, Dispatcher, MAX_REQUEST_SIZE};
pub use error::{Error, Result};
pub use executor::{ToolError, ToolExecutor};
pub use protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_REQUEST, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, PeerInfo, RequestId, ServerCapabilities,
    Tool, ToolContent, ToolsCapability,
};
pub use registry::{ParamType, ParameterSpec, ToolDescriptor, ToolRegistry};
