//! Content blocks carried by assistant messages.

use serde::{Deserialize, Serialize};

fn default_language() -> String {
    "plaintext".to_string()
}

/// Content of a tool result: plain text or a list of structured parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Parts(Vec<serde_json::Map<String, serde_json::Value>>),
}

/// One unit of assistant output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A fenced code block.
    Code {
        /// Source code without fences.
        code: String,
        /// Language tag, `plaintext` when unknown.
        #[serde(default = "default_language")]
        language: String,
    },
    /// Tool invocation. Not produced by the output parser yet.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Tool execution result. Not produced by the output parser yet.
    ToolResult {
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<ToolResultContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    /// Create a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a code block, falling back to `plaintext` for a missing language.
    #[must_use]
    pub fn code(code: impl Into<String>, language: Option<String>) -> Self {
        Self::Code {
            code: code.into(),
            language: language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(default_language),
        }
    }

    /// Returns the text if this is a `Text` block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns true if the block carries no visible content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { text } => text.is_empty(),
            Self::Code { code, .. } => code.is_empty(),
            Self::ToolUse { .. } | Self::ToolResult { .. } => false,
        }
    }
}
