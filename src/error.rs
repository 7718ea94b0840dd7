//! SDK error types.

use std::time::Duration;

use crate::config::ConfigError;
use crate::parser::AiError;

/// Errors surfaced by the SDK.
#[derive(thiserror::Error, Debug)]
pub enum SdkError {
    /// A required credential or setting is missing.
    #[error("{message} (missing: {missing_key})")]
    Configuration {
        message: String,
        missing_key: String,
    },

    /// Configuration file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The CLI executable could not be located.
    #[error("Gemini CLI not found: {binary}")]
    CliNotFound { binary: String },

    /// Spawning or talking to the CLI failed.
    #[error("Failed to communicate with Gemini CLI: {0}")]
    CliConnection(String),

    /// The CLI exited unsuccessfully.
    #[error("Gemini CLI exited with {}: {}", exit_code.map_or_else(|| "signal".to_string(), |c| format!("code {c}")), stderr.trim())]
    Process {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Structured parsing of CLI output failed.
    #[error("{message}")]
    Parsing {
        message: String,
        raw_output: String,
        #[source]
        source: AiError,
    },

    /// JSON could not be decoded.
    #[error("Failed to decode JSON: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// The query was cancelled by the caller.
    #[error("Query cancelled")]
    Cancelled,

    /// The CLI did not finish in time.
    #[error("Gemini CLI timed out after {0:?}")]
    Timeout(Duration),
}

/// Alias kept for code written against the Claude Code SDK.
pub type ClaudeSdkError = SdkError;

/// Result type for SDK operations.
pub type Result<T, E = SdkError> = std::result::Result<T, E>;

impl SdkError {
    /// Create a configuration error naming the missing key.
    #[must_use]
    pub fn configuration(message: impl Into<String>, missing_key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            missing_key: missing_key.into(),
        }
    }

    /// Classify a spawn failure.
    pub(crate) fn from_spawn(binary: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::CliNotFound {
                binary: binary.to_string(),
            },
            _ => Self::CliConnection(err.to_string()),
        }
    }
}
