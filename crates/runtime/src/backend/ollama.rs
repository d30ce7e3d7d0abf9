//! Ollama generate API backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CompletionBackend;
use crate::{Error, Result};

pub const DEFAULT_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Builder for creating an Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaBackendBuilder {
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaBackendBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            model: model.into(),
            temperature: 0.3,
            max_tokens: 500,
            timeout: Duration::from_secs(30),
        }
    }

    /// Base URL of the Ollama server, without the `/api/...` path.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens for responses.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Bound on a single completion request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> OllamaBackend {
        OllamaBackend {
            client: reqwest::Client::new(),
            url: self.url,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        }
    }
}

/// Text completion through a local Ollama server.
pub struct OllamaBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn builder(model: impl Into<String>) -> OllamaBackendBuilder {
        OllamaBackendBuilder::new(model)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn classify(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.timeout)
        } else if error.is_connect() {
            Error::Unreachable {
                url: self.url.clone(),
            }
        } else {
            Error::Network(error.to_string())
        }
    }
}

impl std::fmt::Display for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ollama({}, {})", self.model, self.url)
    }
}

impl CompletionBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!(backend = %self, prompt_len = prompt.len(), "requesting completion");
        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(status.to_string()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        Ok(body.response.trim().to_string())
    }
}
