use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("cannot reach completion backend at {url}")]
    Unreachable { url: String },

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion backend error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
