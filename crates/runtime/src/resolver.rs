//! Tool-call resolution: turn free-text model output into one tool call.
//!
//! Models are asked to answer with `{"tool": ..., "arguments": {...}}`, but
//! they wrap it in prose, emit a bare tool name, or leave arguments empty.
//! Resolution runs an ordered list of strategies; the first one producing a
//! shape-valid candidate wins and later ones are never consulted.

use std::sync::Arc;

use mcp::{Arguments, ToolCall, ToolRegistry};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::query;

/// Why a completion that looked like a tool call could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvedReason {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("could not determine a search query for {0}")]
    MissingQuery(String),
}

/// Result of resolving one completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    ToolInvocation(ToolCall),
    PlainText(String),
    Unresolved(UnresolvedReason),
}

/// Which tool gets query repair and under which argument name.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub search_tool: String,
    pub query_param: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            search_tool: "search_google_in_safari".to_string(),
            query_param: "query".to_string(),
        }
    }
}

/// A shape-valid call proposal, not yet checked against the registry.
#[derive(Debug)]
struct Candidate {
    tool: String,
    arguments: Arguments,
    /// Inferred from a bare tool name rather than stated as JSON.
    implicit: bool,
}

struct Input<'a> {
    completion: &'a str,
    config: &'a ResolverConfig,
}

struct Strategy {
    name: &'static str,
    run: fn(&Input<'_>) -> Option<Candidate>,
}

const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "embedded_object",
        run: embedded_object,
    },
    Strategy {
        name: "whole_completion",
        run: whole_completion,
    },
    Strategy {
        name: "bare_keyword",
        run: bare_keyword,
    },
];

/// Maps completions onto registry tools.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<ToolRegistry>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a raw completion, using the user's original text to repair
    /// a missing search query. Never fails; anything unusable becomes
    /// `PlainText` or `Unresolved`.
    pub fn resolve(&self, completion: &str, original: &str) -> ResolutionOutcome {
        let input = Input {
            completion,
            config: &self.config,
        };

        let Some((strategy, candidate)) = STRATEGIES
            .iter()
            .find_map(|s| (s.run)(&input).map(|c| (s.name, c)))
        else {
            debug!("no tool call in completion");
            return ResolutionOutcome::PlainText(completion.to_string());
        };
        debug!(strategy, tool = %candidate.tool, "tool call candidate");

        let Some(descriptor) = self.registry.find(&candidate.tool) else {
            if candidate.implicit {
                return ResolutionOutcome::PlainText(completion.to_string());
            }
            return ResolutionOutcome::Unresolved(UnresolvedReason::UnknownTool(candidate.tool));
        };

        let mut arguments = candidate.arguments;
        if descriptor.name == self.config.search_tool && arguments.is_blank(&self.config.query_param)
        {
            match repair_query(original) {
                Some(q) => {
                    debug!(query = %q, "repaired search query");
                    arguments.insert(self.config.query_param.clone(), q);
                }
                None if candidate.implicit => {
                    return ResolutionOutcome::PlainText(completion.to_string());
                }
                None => {
                    return ResolutionOutcome::Unresolved(UnresolvedReason::MissingQuery(
                        descriptor.name.clone(),
                    ));
                }
            }
        }

        ResolutionOutcome::ToolInvocation(ToolCall::new(descriptor.name.clone(), arguments))
    }
}

fn repair_query(original: &str) -> Option<String> {
    query::extract(original).or_else(|| query::strip_markers(original))
}

fn embedded_object(input: &Input<'_>) -> Option<Candidate> {
    object_spans(input.completion)
        .into_iter()
        .find_map(parse_candidate)
}

fn whole_completion(input: &Input<'_>) -> Option<Candidate> {
    parse_candidate(input.completion.trim())
}

fn bare_keyword(input: &Input<'_>) -> Option<Candidate> {
    let completion = input.completion.trim().to_lowercase();
    let tool = &input.config.search_tool;
    completion
        .contains(&tool.to_lowercase())
        .then(|| Candidate {
            tool: tool.clone(),
            arguments: Arguments::new(),
            implicit: true,
        })
}

/// Accept `{"tool": "<non-empty>", "arguments": {...}}`. Anything other
/// than an object under `arguments` counts as no arguments.
fn parse_candidate(text: &str) -> Option<Candidate> {
    let value: Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;
    let tool = object.get("tool")?.as_str()?.trim();
    if tool.is_empty() {
        return None;
    }

    let arguments = object
        .get("arguments")
        .cloned()
        .and_then(Arguments::from_json)
        .unwrap_or_default();

    Some(Candidate {
        tool: tool.to_string(),
        arguments,
        implicit: false,
    })
}

/// Brace-delimited spans nesting at most one level deep, left to right and
/// non-overlapping. Braces inside JSON strings do not count.
fn object_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{'
            && let Some(end) = object_end(bytes, i)
        {
            spans.push(&text[i..=end]);
            i = end + 1;
        } else {
            i += 1;
        }
    }
    spans
}

fn object_end(bytes: &[u8], start: usize) -> Option<usize> {
    const MAX_DEPTH: usize = 2;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return None;
                }
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp::ArgValue;

    fn resolver() -> Resolver {
        Resolver::new(Arc::new(host::catalog::registry().unwrap()))
    }

    fn invocation(outcome: ResolutionOutcome) -> ToolCall {
        match outcome {
            ResolutionOutcome::ToolInvocation(call) => call,
            other => panic!("expected a tool invocation, got {other:?}"),
        }
    }

    #[test]
    fn object_embedded_in_prose() {
        let call = invocation(resolver().resolve(
            r#"Sure! {"tool":"open_application","arguments":{"appName":"Safari"}} done"#,
            "open safari",
        ));
        assert_eq!(call.name, "open_application");
        assert_eq!(call.arguments, Arguments::new().with("appName", "Safari"));
    }

    #[test]
    fn empty_search_query_is_repaired_from_user_text() {
        let call = invocation(resolver().resolve(
            r#"{"tool":"search_google_in_safari","arguments":{}}"#,
            "find apple pie in google",
        ));
        assert_eq!(call.name, "search_google_in_safari");
        assert_eq!(call.arguments.get_str("query"), Some("apple pie"));
    }

    #[test]
    fn prose_passes_through() {
        let text = "The capital of France is Paris.";
        assert_eq!(
            resolver().resolve(text, "what is the capital of France?"),
            ResolutionOutcome::PlainText(text.to_string())
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let r = resolver();
        let completion = r#"ok {"tool":"search_google_in_safari","arguments":{"query":""}}"#;
        let first = r.resolve(completion, "search for rust in google");
        let second = r.resolve(completion, "search for rust in google");
        assert_eq!(first, second);
    }

    #[test]
    fn first_shape_valid_object_wins() {
        let call = invocation(resolver().resolve(
            r#"{"note":"thinking"} {"tool":"quit_application","arguments":{"appName":"Notes"}} {"tool":"open_application","arguments":{"appName":"Mail"}}"#,
            "close notes",
        ));
        assert_eq!(call.name, "quit_application");
        assert_eq!(call.arguments.get_str("appName"), Some("Notes"));
    }

    #[test]
    fn later_candidates_are_not_consulted() {
        let outcome = resolver().resolve(
            r#"{"tool":"launch_rocket"} {"tool":"open_application","arguments":{"appName":"Mail"}}"#,
            "launch",
        );
        assert_eq!(
            outcome,
            ResolutionOutcome::Unresolved(UnresolvedReason::UnknownTool("launch_rocket".into()))
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let call = invocation(resolver().resolve(
            r#"Running: {"tool":"run_applescript","arguments":{"appName":"Finder","script":"set x to {1, 2}"}}"#,
            "run a script",
        ));
        assert_eq!(call.arguments.get_str("script"), Some("set x to {1, 2}"));
    }

    #[test]
    fn deeply_nested_call_uses_whole_completion() {
        let call = invocation(resolver().resolve(
            r#"{"tool":"mongodb_find_documents","arguments":{"databaseName":"shop","collectionName":"items","filter":{"sku":"A1"}}}"#,
            "find item A1",
        ));
        assert_eq!(call.name, "mongodb_find_documents");
        assert_eq!(
            call.arguments.get("filter"),
            Some(&ArgValue::Raw(serde_json::json!({"sku": "A1"})))
        );
    }

    #[test]
    fn non_object_arguments_count_as_empty() {
        let call = invocation(resolver().resolve(
            r#"{"tool":"get_running_applications","arguments":"none"}"#,
            "what is running",
        ));
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn tool_names_match_case_insensitively() {
        let call = invocation(resolver().resolve(
            r#"{"tool":"Open_Application","arguments":{"appName":"Notes"}}"#,
            "open notes",
        ));
        assert_eq!(call.name, "open_application");
    }

    #[test]
    fn blank_tool_name_is_not_a_call() {
        let text = r#"{"tool":"  ","arguments":{}}"#;
        assert_eq!(
            resolver().resolve(text, "hello"),
            ResolutionOutcome::PlainText(text.to_string())
        );
    }

    #[test]
    fn missing_required_arguments_are_forwarded() {
        let call = invocation(resolver().resolve(
            r#"{"tool":"open_application","arguments":{}}"#,
            "open something",
        ));
        assert_eq!(call.name, "open_application");
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn bare_tool_name_triggers_search() {
        let call = invocation(resolver().resolve("search_google_in_safari", "google rust"));
        assert_eq!(call.name, "search_google_in_safari");
        assert_eq!(call.arguments.get_str("query"), Some("rust"));
    }

    #[test]
    fn bare_tool_name_without_query_is_plain_text() {
        assert_eq!(
            resolver().resolve("Search_Google_In_Safari", "search for"),
            ResolutionOutcome::PlainText("Search_Google_In_Safari".into())
        );
    }

    #[test]
    fn explicit_search_without_query_is_unresolved() {
        assert_eq!(
            resolver().resolve(r#"{"tool":"search_google_in_safari"}"#, "find"),
            ResolutionOutcome::Unresolved(UnresolvedReason::MissingQuery(
                "search_google_in_safari".into()
            ))
        );
    }

    #[test]
    fn last_resort_uses_remaining_words() {
        let call = invocation(resolver().resolve(
            r#"{"tool":"search_google_in_safari","arguments":{"query":""}}"#,
            "weather Paris",
        ));
        assert_eq!(call.arguments.get_str("query"), Some("weather Paris"));
    }

    #[test]
    fn existing_query_is_kept() {
        let call = invocation(resolver().resolve(
            r#"{"tool":"search_google_in_safari","arguments":{"query":"MCP"}}"#,
            "find information about MCP in google",
        ));
        assert_eq!(call.arguments.get_str("query"), Some("MCP"));
    }

    #[test]
    fn spans_skip_unbalanced_and_too_deep() {
        assert_eq!(object_spans(r#"{"a":{"b":1}} {"c":2}"#), [r#"{"a":{"b":1}}"#, r#"{"c":2}"#]);
        assert_eq!(object_spans(r#"{"a":{"b":{"c":1}}}"#), [r#"{"b":{"c":1}}"#]);
        assert!(object_spans("{ unterminated").is_empty());
    }
}
