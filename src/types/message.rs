//! Conversation messages matching the Claude Code SDK contract.

use serde::{Deserialize, Serialize};

use super::ContentBlock;

/// Prompt echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub content: String,
}

/// Assistant turn with ordered content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: Vec<ContentBlock>,
}

impl AssistantMessage {
    /// Concatenate all text blocks, separated by newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Environment metadata emitted before the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub subtype: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Terminal message of every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    /// `success`, `error` or `parsing_fallback`.
    pub subtype: String,
    pub duration_ms: u64,
    pub is_error: bool,
    pub session_id: String,
    #[serde(default = "default_num_turns")]
    pub num_turns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

fn default_num_turns() -> u32 {
    1
}

/// Result subtype for a cleanly parsed response.
pub const SUBTYPE_SUCCESS: &str = "success";
/// Result subtype when the parsed response reported an error.
pub const SUBTYPE_ERROR: &str = "error";
/// Result subtype when structured parsing failed and raw text was returned.
pub const SUBTYPE_PARSING_FALLBACK: &str = "parsing_fallback";

impl ResultMessage {
    /// Create a single-turn result with no cost or usage data.
    #[must_use]
    pub fn new(subtype: impl Into<String>, is_error: bool, session_id: impl Into<String>) -> Self {
        Self {
            subtype: subtype.into(),
            duration_ms: 0,
            is_error,
            session_id: session_id.into(),
            num_turns: 1,
            total_cost_usd: None,
            usage: None,
            result: None,
        }
    }

    /// Set the summary text.
    #[must_use]
    pub fn with_result(mut self, result: Option<String>) -> Self {
        self.result = result;
        self
    }

    /// Set the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Replace the session identifier.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Returns true for the degraded raw-text result.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.subtype == SUBTYPE_PARSING_FALLBACK
    }
}

/// Messages produced by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    User(UserMessage),
    Assistant(AssistantMessage),
    Result(ResultMessage),
}

impl Message {
    /// Returns true if this is the terminal `Result` message.
    #[must_use]
    pub fn is_result(&self) -> bool {
        matches!(self, Self::Result(_))
    }

    /// Returns the assistant payload, if any.
    #[must_use]
    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Self::Assistant(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the result payload, if any.
    #[must_use]
    pub fn as_result(&self) -> Option<&ResultMessage> {
        match self {
            Self::Result(msg) => Some(msg),
            _ => None,
        }
    }

    /// Wrap blocks in an assistant message.
    #[must_use]
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::Assistant(AssistantMessage { content })
    }

    /// The `type` tag used on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::User(_) => "user",
            Self::Assistant(_) => "assistant",
            Self::Result(_) => "result",
        }
    }
}
