//! Completion backend abstraction.
//!
//! The resolver only needs raw text back from a prompt, so a backend is a
//! single call: prompt in, completion out.

mod ollama;

pub use ollama::{DEFAULT_MODEL, DEFAULT_URL, OllamaBackend, OllamaBackendBuilder};

use crate::Result;
use std::future::Future;

/// Trait for text-completion backends.
pub trait CompletionBackend: Send + Sync {
    /// Send a prompt and return the raw completion text.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}
