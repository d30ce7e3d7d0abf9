//! Natural-language front end for the tool server.
//!
//! This crate turns a free-text request into at most one tool call:
//!
//! - **CompletionBackend**: sends a prompt to a text-generation service
//!   (Ollama) and returns the raw completion.
//! - **Resolver**: extracts a `(tool, arguments)` pair from the completion,
//!   repairing a missing search query from the user's own words.
//! - **Assistant**: runs one turn end to end and reports the outcome as a
//!   [`Reply`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use runtime::{Assistant, OllamaBackend};
//!
//! # async fn example(executor: impl mcp::ToolExecutor) -> mcp::Result<()> {
//! let registry = Arc::new(host::catalog::registry()?);
//! let backend = OllamaBackend::builder("llama3.2").build();
//!
//! let assistant = Assistant::new(backend, executor, registry);
//! let reply = assistant.ask("find apple pie in google").await;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

mod assistant;
mod backend;
mod error;
pub mod prompt;
pub mod query;
mod resolver;

pub use assistant::{Assistant, AssistantConfig, Reply};
pub use backend::{
    CompletionBackend, DEFAULT_MODEL, DEFAULT_URL, OllamaBackend, OllamaBackendBuilder,
};
pub use error::{Error, Result};
pub use resolver::{ResolutionOutcome, Resolver, ResolverConfig, UnresolvedReason};
