//! Tool executor trait.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::call::ToolCall;
use crate::protocol::CallToolResult;

/// Errors that can occur during tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("{0}")]
    Execution(String),
    #[error("tool not available on this host: {0}")]
    Unavailable(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Trait for tool executors.
///
/// Implementations run a tool by name and return its text output. This is
/// the boundary between the dispatch core and side effects: the core only
/// sees the text or the failure message.
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool call.
    fn execute(&self, call: &ToolCall) -> impl Future<Output = Result<String, ToolError>> + Send;
}

impl CallToolResult {
    /// Collapse into the executor contract: text on success, message on failure.
    pub fn into_text(self) -> Result<String, ToolError> {
        let text = self.text_content();
        if self.failed() {
            let message = text.strip_prefix("Error: ").unwrap_or(&text);
            Err(ToolError::Execution(message.to_string()))
        } else {
            Ok(text)
        }
    }
}
