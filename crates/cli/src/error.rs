//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The tool catalog or a tool server failed.
    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    /// `ask` was run without any request text.
    #[error("no request given")]
    EmptyRequest,

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
