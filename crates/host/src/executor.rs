//! In-process executor for the catalog tools.

use std::time::Duration;

use mcp::{ToolCall, ToolError, ToolExecutor};
use tracing::{debug, info};

use crate::catalog::*;
use crate::ollama::OllamaClient;
use crate::process;

const RUNNING_APPS_SCRIPT: &str = "tell application \"System Events\" to get name of every application process whose background only is false";

/// Settings for a [`HostExecutor`].
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub ollama_url: String,
    pub command_timeout: Duration,
    pub default_model: String,
    /// Program used to launch applications (`open` on macOS).
    pub open_program: String,
    /// Program used to run AppleScript (`osascript` on macOS).
    pub osascript_program: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            command_timeout: Duration::from_secs(30),
            default_model: DEFAULT_MODEL.to_string(),
            open_program: "open".to_string(),
            osascript_program: "osascript".to_string(),
        }
    }
}

/// Runs catalog tools on the local machine.
///
/// Application tools shell out to `open` and `osascript`; model tools talk
/// to Ollama over HTTP. The database tools are declared in the catalog but
/// have no backing driver here.
pub struct HostExecutor {
    config: HostConfig,
    ollama: OllamaClient,
}

impl HostExecutor {
    pub fn new(config: HostConfig) -> Self {
        let ollama = OllamaClient::new(config.ollama_url.clone(), config.command_timeout);
        Self { config, ollama }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    async fn open(&self, args: &[&str]) -> Result<process::Output, ToolError> {
        process::run(&self.config.open_program, args, self.config.command_timeout).await
    }

    async fn osascript(&self, script: &str) -> Result<process::Output, ToolError> {
        process::run(
            &self.config.osascript_program,
            &["-e", script],
            self.config.command_timeout,
        )
        .await
    }

    async fn open_application(&self, call: &ToolCall) -> Result<String, ToolError> {
        let app = required(call, "appName")?;
        self.open(&["-a", &app])
            .await?
            .checked(&format!("Failed to launch application \"{app}\""))?;
        Ok(format!("Application \"{app}\" successfully launched"))
    }

    async fn running_applications(&self) -> Result<String, ToolError> {
        let stdout = self
            .osascript(RUNNING_APPS_SCRIPT)
            .await?
            .checked("Failed to get list of applications")?;
        Ok(format_running_apps(&stdout))
    }

    async fn run_applescript(&self, call: &ToolCall) -> Result<String, ToolError> {
        let app = required(call, "appName")?;
        let script = required(call, "script")?;
        let output = self
            .osascript(&format!("tell application \"{app}\"\n{script}\nend tell"))
            .await?;

        let stdout = output.stdout.trim();
        let stderr = output.stderr.trim();
        Ok(if !stdout.is_empty() {
            stdout.to_string()
        } else if !stderr.is_empty() {
            stderr.to_string()
        } else {
            "Command executed successfully".to_string()
        })
    }

    async fn quit_application(&self, call: &ToolCall) -> Result<String, ToolError> {
        let app = required(call, "appName")?;
        self.osascript(&format!("tell application \"{app}\"\nquit\nend tell"))
            .await?
            .checked(&format!("Failed to close application \"{app}\""))?;
        Ok(format!("Application \"{app}\" closed"))
    }

    async fn open_file_with_app(&self, call: &ToolCall) -> Result<String, ToolError> {
        let path = required(call, "path")?;
        let app = required(call, "appName")?;
        self.open(&["-a", &app, &path])
            .await?
            .checked("Failed to open file")?;
        Ok(format!("File \"{path}\" opened in application \"{app}\""))
    }

    async fn search_google(&self, call: &ToolCall) -> Result<String, ToolError> {
        let query = call
            .arguments
            .get("query")
            .map(|v| v.to_text())
            .unwrap_or_default();
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::Execution("Search query cannot be empty".into()));
        }

        let url = search_url(query);
        debug!(%url, "opening search");
        self.open(&["-a", "Safari", &url])
            .await?
            .checked("Failed to open search in Safari")?;
        Ok(format!("Search \"{query}\" opened in Safari"))
    }

    async fn ollama_generate(&self, call: &ToolCall) -> Result<String, ToolError> {
        let prompt = required(call, "prompt")?;
        let model = call
            .arguments
            .get_str("model")
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.default_model);
        self.ollama.generate(model, &prompt).await
    }
}

impl ToolExecutor for HostExecutor {
    async fn execute(&self, call: &ToolCall) -> Result<String, ToolError> {
        info!(tool = %call.name, "executing host tool");
        match call.name.as_str() {
            OPEN_APPLICATION => self.open_application(call).await,
            GET_RUNNING_APPLICATIONS => self.running_applications().await,
            RUN_APPLESCRIPT => self.run_applescript(call).await,
            QUIT_APPLICATION => self.quit_application(call).await,
            OPEN_FILE_WITH_APP => self.open_file_with_app(call).await,
            SEARCH_GOOGLE_IN_SAFARI => self.search_google(call).await,
            OLLAMA_GENERATE => self.ollama_generate(call).await,
            OLLAMA_LIST_MODELS => self.ollama.list_models().await,
            MONGODB_CREATE_DATABASE
            | MONGODB_LIST_DATABASES
            | MONGODB_CREATE_COLLECTION
            | MONGODB_LIST_COLLECTIONS
            | MONGODB_DELETE_COLLECTION
            | MONGODB_INSERT_DOCUMENT
            | MONGODB_FIND_DOCUMENTS
            | MONGODB_DELETE_DOCUMENT => Err(ToolError::Unavailable(call.name.clone())),
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }
}

/// Google search URL for a query.
pub fn search_url(query: &str) -> String {
    format!(
        "https://www.google.com/search?q={}",
        urlencoding::encode(query)
    )
}

fn format_running_apps(stdout: &str) -> String {
    let apps: Vec<&str> = stdout
        .trim()
        .split(", ")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();
    format!("Running applications:\n{}", apps.join("\n"))
}

fn required(call: &ToolCall, key: &str) -> Result<String, ToolError> {
    call.arguments
        .get(key)
        .filter(|v| !v.is_blank())
        .map(|v| v.to_text())
        .ok_or_else(|| ToolError::InvalidInput(format!("missing required argument: {key}")))
}
