//! Where tool calls go: in-process or to a tool server subprocess.

use std::sync::Arc;
use std::time::Duration;

use host::{HostConfig, HostExecutor};
use mcp::{
    Client, ClientConfig, DispatchConfig, Dispatcher, ToolCall, ToolError, ToolExecutor,
    ToolRegistry,
};

use crate::config::Config;
use crate::error::Result;

/// Extra time a remote call gets over the server's own tool timeout, so the
/// server reports its timeout before the client gives up.
const REMOTE_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

pub enum Tools {
    /// The dispatch core running in this process, with validation and
    /// timeouts applied exactly as `macpilot serve` would.
    Local(Dispatcher<HostExecutor>),
    /// A tool server reached over its stdio.
    Remote(Client),
}

impl Tools {
    pub fn local(registry: Arc<ToolRegistry>, config: &Config) -> Self {
        Self::Local(dispatcher(registry, config))
    }

    pub async fn remote(command: &str, args: &[String], config: &Config) -> Result<Self> {
        let mut client_config = ClientConfig::new(command).args(args.iter().cloned());
        client_config.timeout = remote_timeout(config);
        Ok(Self::Remote(Client::connect(client_config).await?))
    }
}

impl ToolExecutor for Tools {
    async fn execute(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
        match self {
            Self::Local(dispatcher) => dispatcher.execute(call).await,
            Self::Remote(client) => client.execute(call).await,
        }
    }
}

fn remote_timeout(config: &Config) -> Duration {
    config.tool_timeout() + REMOTE_TIMEOUT_MARGIN
}

/// The dispatch core over the host executor, configured from `config`.
pub fn dispatcher(registry: Arc<ToolRegistry>, config: &Config) -> Dispatcher<HostExecutor> {
    let host = HostExecutor::new(HostConfig {
        ollama_url: config.tools.ollama_url.clone(),
        command_timeout: config.tool_timeout(),
        ..HostConfig::default()
    });
    Dispatcher::new(registry, host).with_config(DispatchConfig {
        server_name: config.server.name.clone(),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        tool_timeout: config.tool_timeout(),
        ..DispatchConfig::default()
    })
}
