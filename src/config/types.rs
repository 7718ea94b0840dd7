//! Configuration types.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::EnvSnapshot;
use crate::error::SdkError;

/// Model provider used for structured parsing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Claude,
}

/// Configuration for the structured output parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Provider to use (gemini or claude).
    #[serde(default)]
    pub provider: ProviderKind,
    /// Model used for parsing.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in the parse response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Base URL for the API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variables checked, in order, for the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Vec<String>,
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

/// Gemini REST API root.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Claude API root.
pub const CLAUDE_API_BASE_URL: &str = "https://api.anthropic.com";

fn default_base_url() -> String {
    GEMINI_API_BASE_URL.to_string()
}

fn default_api_key_env() -> Vec<String> {
    vec!["GEMINI_API_KEY".to_string(), "GOOGLE_API_KEY".to_string()]
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl ParserConfig {
    /// API root for the selected provider.
    ///
    /// The Claude provider swaps the Gemini default for its own endpoint.
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        match self.provider {
            ProviderKind::Claude if self.base_url == GEMINI_API_BASE_URL => CLAUDE_API_BASE_URL,
            _ => &self.base_url,
        }
    }

    /// Find the API key in the first configured variable that is set.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Configuration` naming every variable checked.
    pub fn resolve_api_key(&self, env: &EnvSnapshot) -> Result<String, SdkError> {
        self.api_key_env
            .iter()
            .find_map(|name| env.get(name))
            .map(String::from)
            .ok_or_else(|| {
                let provider = match self.provider {
                    ProviderKind::Gemini => "Gemini",
                    ProviderKind::Claude => "Claude",
                };
                SdkError::configuration(
                    format!("{provider} API key required for parsing"),
                    self.api_key_env.join(" or "),
                )
            })
    }
}

/// Configuration for invoking the Gemini CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Executable name or path.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Arguments placed before the generated ones (e.g. `npx @google/gemini-cli`).
    #[serde(default)]
    pub prefix_args: Vec<String>,
    /// Kill the CLI if it runs longer than this.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Extra environment for the child process.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_binary() -> String {
    "gemini".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            prefix_args: Vec::new(),
            env: HashMap::new(),
            timeout_secs: None,
        }
    }
}

impl CliConfig {
    /// Process timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Top-level SDK configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Emit a leading system message describing the environment.
    #[serde(default = "default_true")]
    pub include_system_message: bool,
    /// Log level requested through configuration or `GEMINI_SDK_DEBUG`.
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub cli: CliConfig,
    #[serde(default)]
    pub parser: ParserConfig,
}

fn default_true() -> bool {
    true
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            cli: CliConfig::default(),
            parser: ParserConfig::default(),
            include_system_message: true,
            log_level: None,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl SdkConfig {
    /// Overlay settings taken from the environment.
    #[must_use]
    pub fn with_env(mut self, env: &EnvSnapshot) -> Self {
        if let Some(model) = env.get("GEMINI_PARSER_MODEL") {
            self.parser.model = model.to_string();
        }
        if let Some(binary) = env.get("GEMINI_CLI_PATH") {
            self.cli.binary = binary.to_string();
        }
        if let Some(level) = env.get("GEMINI_SDK_DEBUG") {
            let level = match level.to_ascii_lowercase().as_str() {
                "warning" => "warn".to_string(),
                "critical" => "error".to_string(),
                other => other.to_string(),
            };
            if LOG_LEVELS.contains(&level.as_str()) {
                self.log_level = Some(level);
            } else {
                tracing::debug!(value = %level, "Ignoring unknown GEMINI_SDK_DEBUG level");
            }
        }
        self
    }
}
