//! One natural-language turn: prompt, completion, resolution, execution.

use std::sync::Arc;
use std::time::Duration;

use mcp::{ToolCall, ToolExecutor, ToolRegistry};
use tracing::{info, warn};

use crate::backend::CompletionBackend;
use crate::prompt;
use crate::resolver::{ResolutionOutcome, Resolver, ResolverConfig};
use crate::{Error, Result};

/// Settings for an [`Assistant`].
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub completion_timeout: Duration,
    pub resolver: ResolverConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            completion_timeout: Duration::from_secs(30),
            resolver: ResolverConfig::default(),
        }
    }
}

/// What the user sees after one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// The tool call that was executed, if any.
    pub call: Option<ToolCall>,
    pub is_error: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            call: None,
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            call: None,
            is_error: true,
        }
    }
}

/// Maps free-text requests onto a single tool call and runs it.
pub struct Assistant<B, E> {
    backend: B,
    executor: E,
    registry: Arc<ToolRegistry>,
    resolver: Resolver,
    system: String,
    config: AssistantConfig,
}

impl<B: CompletionBackend, E: ToolExecutor> Assistant<B, E> {
    pub fn new(backend: B, executor: E, registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(backend, executor, registry, AssistantConfig::default())
    }

    pub fn with_config(
        backend: B,
        executor: E,
        registry: Arc<ToolRegistry>,
        config: AssistantConfig,
    ) -> Self {
        let resolver = Resolver::new(Arc::clone(&registry)).with_config(config.resolver.clone());
        let system = prompt::system_prompt(registry.list(), &config.resolver.search_tool);
        Self {
            backend,
            executor,
            registry,
            resolver,
            system,
            config,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Ask the backend about one request, bounded by the completion timeout.
    pub async fn complete(&self, user_text: &str) -> Result<String> {
        let prompt = prompt::build(&self.system, user_text);
        let limit = self.config.completion_timeout;
        tokio::time::timeout(limit, self.backend.complete(&prompt))
            .await
            .map_err(|_| Error::Timeout(limit))?
    }

    /// Handle one user turn. Failures are reported in the reply, never raised.
    pub async fn ask(&self, user_text: &str) -> Reply {
        let completion = match self.complete(user_text).await {
            Ok(completion) => completion,
            Err(Error::Unreachable { url }) => {
                warn!(%url, "completion backend unreachable");
                return Reply::error(format!(
                    "Failed to connect to Ollama at {url}. Start it with: ollama serve"
                ));
            }
            Err(e) => {
                warn!(error = %e, "completion failed");
                return Reply::error(format!("Error: {e}"));
            }
        };

        match self.resolver.resolve(&completion, user_text) {
            ResolutionOutcome::PlainText(text) => Reply::text(text),
            ResolutionOutcome::Unresolved(reason) => {
                warn!(%reason, "could not resolve tool call");
                Reply::error(format!("could not resolve the request: {reason}"))
            }
            ResolutionOutcome::ToolInvocation(call) => {
                info!(tool = %call.name, "executing tool call");
                match self.executor.execute(&call).await {
                    Ok(text) => Reply {
                        text,
                        call: Some(call),
                        is_error: false,
                    },
                    Err(e) => Reply {
                        text: format!("Error: {e}"),
                        call: Some(call),
                        is_error: true,
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp::{Arguments, ToolError};
    use std::sync::Mutex;

    enum Canned {
        Text(&'static str),
        Unreachable,
        Hang,
    }

    struct FakeBackend {
        canned: Canned,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(canned: Canned) -> Self {
            Self {
                canned,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionBackend for FakeBackend {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.canned {
                Canned::Text(text) => Ok(text.to_string()),
                Canned::Unreachable => Err(Error::Unreachable {
                    url: "http://localhost:11434".into(),
                }),
                Canned::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(String::new())
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<ToolCall>>,
    }

    impl ToolExecutor for RecordingExecutor {
        async fn execute(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
            self.calls.lock().unwrap().push(call.clone());
            match call.name.as_str() {
                "quit_application" => Err(ToolError::Execution("Notes is not running".into())),
                _ => Ok(format!("ran {}", call.name)),
            }
        }
    }

    fn assistant(canned: Canned) -> Assistant<FakeBackend, RecordingExecutor> {
        let registry = Arc::new(host::catalog::registry().unwrap());
        Assistant::with_config(
            FakeBackend::new(canned),
            RecordingExecutor::default(),
            registry,
            AssistantConfig {
                completion_timeout: Duration::from_millis(50),
                ..AssistantConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn tool_call_is_executed() {
        let a = assistant(Canned::Text(
            r#"{"tool":"search_google_in_safari","arguments":{}}"#,
        ));
        let reply = a.ask("find apple pie in google").await;

        assert_eq!(reply.text, "ran search_google_in_safari");
        assert!(!reply.is_error);
        let expected = ToolCall::new(
            "search_google_in_safari",
            Arguments::new().with("query", "apple pie"),
        );
        assert_eq!(reply.call, Some(expected.clone()));
        assert_eq!(*a.executor.calls.lock().unwrap(), [expected]);
    }

    #[tokio::test]
    async fn prompt_carries_catalog_and_user_text() {
        let a = assistant(Canned::Text("Hello!"));
        a.ask("Open Notes").await;

        let prompts = a.backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("- open_application: "));
        assert!(prompts[0].ends_with("User: Open Notes\nAssistant:"));
    }

    #[tokio::test]
    async fn plain_text_is_returned_as_is() {
        let a = assistant(Canned::Text("The capital of France is Paris."));
        let reply = a.ask("capital of France?").await;
        assert_eq!(reply, Reply::text("The capital of France is Paris."));
        assert!(a.executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_explains_remedy() {
        let reply = assistant(Canned::Unreachable).ask("open Safari").await;
        assert!(reply.is_error);
        assert!(reply.text.contains("ollama serve"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let reply = assistant(Canned::Hang).ask("open Safari").await;
        assert!(reply.is_error);
        assert_eq!(reply.text, "Error: completion timed out after 50ms");
    }

    #[tokio::test]
    async fn unknown_tool_is_unresolved() {
        let reply = assistant(Canned::Text(r#"{"tool":"launch_rocket","arguments":{}}"#))
            .ask("launch")
            .await;
        assert!(reply.is_error);
        assert_eq!(
            reply.text,
            "could not resolve the request: unknown tool: launch_rocket"
        );
    }

    #[tokio::test]
    async fn tool_failure_is_reported() {
        let reply = assistant(Canned::Text(
            r#"{"tool":"quit_application","arguments":{"appName":"Notes"}}"#,
        ))
        .ask("close Notes")
        .await;
        assert!(reply.is_error);
        assert_eq!(reply.text, "Error: Notes is not running");
        assert_eq!(reply.call.map(|c| c.name), Some("quit_application".into()));
    }
}
