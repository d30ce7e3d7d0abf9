//! Ollama HTTP API calls backing the `ollama_*` tools.

use std::time::Duration;

use mcp::ToolError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
    #[serde(default)]
    size: u64,
}

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct OllamaClient {
    client: reqwest::Client,
    url: String,
    generate_timeout: Duration,
    list_timeout: Duration,
}

impl OllamaClient {
    pub fn new(url: impl Into<String>, generate_timeout: Duration) -> Self {
        let url: String = url.into();
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            generate_timeout,
            list_timeout: Duration::from_secs(10),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String, ToolError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .timeout(self.generate_timeout)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!("Ollama error: {status}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("Ollama error: {e}")))?;
        Ok(body
            .response
            .unwrap_or_else(|| "No response from model".to_string()))
    }

    pub async fn list_models(&self) -> Result<String, ToolError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.url))
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!("Ollama error: {status}")));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("Ollama error: {e}")))?;
        Ok(format_models(&tags.models))
    }

    fn request_error(&self, error: reqwest::Error) -> ToolError {
        if error.is_connect() {
            ToolError::Execution(format!(
                "Failed to connect to Ollama server ({}). Make sure Ollama is running: ollama serve",
                self.url
            ))
        } else {
            ToolError::Execution(format!("Ollama error: {error}"))
        }
    }
}

fn format_models(models: &[ModelInfo]) -> String {
    if models.is_empty() {
        return "No available models. Load a model: ollama pull llama3.2".to_string();
    }
    let lines: Vec<String> = models
        .iter()
        .map(|m| format!("- {} ({:.2} GB)", m.name, m.size as f64 / BYTES_PER_GB))
        .collect();
    format!("Available Ollama models:\n{}", lines.join("\n"))
}
