//! Configuration loading from macpilot.toml.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "macpilot.toml";

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Top-level configuration. Every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion backend used to interpret requests.
    pub backend: BackendConfig,

    /// Settings for the in-process tool executor.
    pub tools: ToolsConfig,

    /// Identity reported by `macpilot serve`.
    pub server: ServerConfig,
}

/// Completion backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: runtime::DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

/// Tool execution configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Ollama server used by the `ollama_*` tools.
    pub ollama_url: String,
    /// Bound on a single tool call.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: mcp::DispatchConfig::default().server_name,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment overrides.
    ///
    /// `OLLAMA_API_URL` replaces both Ollama URLs and `MACPILOT_MODEL` the
    /// backend model. The lookup is injected so callers decide where values
    /// come from.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("OLLAMA_API_URL").filter(|v| !v.trim().is_empty()) {
            self.backend.url = url.clone();
            self.tools.ollama_url = url;
        }
        if let Some(model) = lookup("MACPILOT_MODEL").filter(|v| !v.trim().is_empty()) {
            self.backend.model = model;
        }
        self
    }

    /// Reject values that would make every call fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "backend.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "tools.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.model must not be empty".into()));
        }
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.url, "http://localhost:11434");
        assert_eq!(config.backend.model, "llama3.2");
        assert_eq!(config.backend.max_tokens, 500);
        assert_eq!(config.tool_timeout(), Duration::from_secs(30));
        assert_eq!(config.server.name, "mac-apps-mcp-server");
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [backend]
            model = "deepseek-r1:8b"
            timeout_secs = 60

            [server]
            name = "desk"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.model, "deepseek-r1:8b");
        assert_eq!(config.backend_timeout(), Duration::from_secs(60));
        assert!((config.backend.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.server.name, "desk");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse("[backend\nmodel = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_urls_and_model() {
        let config = Config::default().apply_env(|key| match key {
            "OLLAMA_API_URL" => Some("http://gpu-box:11434".into()),
            "MACPILOT_MODEL" => Some("qwen2.5".into()),
            _ => None,
        });
        assert_eq!(config.backend.url, "http://gpu-box:11434");
        assert_eq!(config.tools.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.backend.model, "qwen2.5");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = Config::default().apply_env(|_| Some("  ".into()));
        assert_eq!(config.backend.model, "llama3.2");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config::parse("[tools]\ntimeout_secs = 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/macpilot.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
