//! Prompt construction for tool selection.

use std::fmt::Write;

use mcp::ToolDescriptor;

const INSTRUCTIONS: &str = r#"When the user asks to open an application, perform an action, or get information, determine which tool to use and return JSON in the format:
{
    "tool": "tool_name",
    "arguments": {"parameter": "value"}
}

If the request doesn't require using tools, just respond with regular text."#;

const EXAMPLES: &[(&str, &str)] = &[
    (
        "Open Calculator",
        r#"{"tool": "open_application", "arguments": {"appName": "Calculator"}}"#,
    ),
    (
        "What applications are running?",
        r#"{"tool": "get_running_applications", "arguments": {}}"#,
    ),
    (
        "Close Safari",
        r#"{"tool": "quit_application", "arguments": {"appName": "Safari"}}"#,
    ),
    (
        "Create database test",
        r#"{"tool": "mongodb_create_database", "arguments": {"databaseName": "test"}}"#,
    ),
    (
        "Create collection users in database test",
        r#"{"tool": "mongodb_create_collection", "arguments": {"databaseName": "test", "collectionName": "users"}}"#,
    ),
    (
        "Find apple image in Google",
        r#"{"tool": "search_google_in_safari", "arguments": {"query": "apple image"}}"#,
    ),
    (
        "Search Google for Python",
        r#"{"tool": "search_google_in_safari", "arguments": {"query": "Python"}}"#,
    ),
    (
        "Find information about MCP in Google",
        r#"{"tool": "search_google_in_safari", "arguments": {"query": "MCP"}}"#,
    ),
];

/// System instructions listing every tool and the expected reply format.
pub fn system_prompt(tools: &[ToolDescriptor], search_tool: &str) -> String {
    let mut prompt =
        String::from("You are an assistant that can manage Mac applications through tools.\n\n");

    prompt.push_str("Available tools:\n");
    for tool in tools {
        let _ = writeln!(prompt, "- {}: {}", tool.name, tool.description);
        if !tool.parameters.is_empty() {
            let params: Vec<String> = tool
                .parameters
                .iter()
                .map(|p| {
                    let required = if p.required { ", required" } else { "" };
                    format!("{} ({}{required})", p.name, p.param_type)
                })
                .collect();
            let _ = writeln!(prompt, "  parameters: {}", params.join(", "));
        }
    }

    prompt.push('\n');
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\nExamples:\n");
    for (request, reply) in EXAMPLES {
        let _ = writeln!(prompt, "- \"{request}\" -> {reply}");
    }

    let _ = write!(
        prompt,
        "\nIMPORTANT:\n\
         - For {search_tool} always extract the search query from the user's text and pass it in the \"query\" parameter.\n\
         - ALWAYS return ONLY a valid JSON object in the format {{\"tool\": \"...\", \"arguments\": {{...}}}}. \
         Do not return just text or a tool name without JSON. Do not return empty arguments.\n\n\
         Respond ONLY with JSON, without additional explanations or text."
    );
    prompt
}

/// Full prompt for one user turn.
pub fn build(system: &str, user_text: &str) -> String {
    format!("{system}\n\nUser: {user_text}\nAssistant:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp::{ParamType, ParameterSpec};

    fn tools() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("open_application", "Opens an application on macOS").param(
                ParameterSpec::required("appName", ParamType::String, "Application name"),
            ),
            ToolDescriptor::new("get_running_applications", "Lists running applications"),
        ]
    }

    #[test]
    fn lists_tools_in_order() {
        let prompt = system_prompt(&tools(), "search_google_in_safari");
        let open = prompt
            .find("- open_application: Opens an application on macOS\n")
            .unwrap();
        let running = prompt
            .find("- get_running_applications: Lists running applications\n")
            .unwrap();
        assert!(open < running);
    }

    #[test]
    fn lists_parameters_under_their_tool() {
        let generate = vec![
            ToolDescriptor::new("ollama_generate", "Generates text")
                .param(ParameterSpec::required("prompt", ParamType::String, "Prompt"))
                .param(ParameterSpec::optional("model", ParamType::String, "Model")),
        ];
        let prompt = system_prompt(&generate, "search_google_in_safari");
        assert!(prompt.contains(
            "- ollama_generate: Generates text\n  parameters: prompt (string, required), model (string)\n"
        ));
        assert!(!system_prompt(&tools()[1..], "x").contains("parameters:"));
    }

    #[test]
    fn names_the_search_tool() {
        let prompt = system_prompt(&tools(), "web_search");
        assert!(prompt.contains("For web_search always extract the search query"));
    }

    #[test]
    fn ends_with_user_turn() {
        let full = build("SYSTEM", "Open Notes");
        assert_eq!(full, "SYSTEM\n\nUser: Open Notes\nAssistant:");
    }
}
