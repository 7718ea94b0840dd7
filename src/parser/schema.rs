//! Response schema demanded from the structured output call.

use serde::{Deserialize, Serialize};

use super::{extract_json, AiError, ModelReply};
use crate::types::ContentBlock;

/// Maximum length of [`ParsedResponse::summary`] in characters.
pub const SUMMARY_MAX_CHARS: usize = 100;

/// Kind of a parsed content section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsedContentKind {
    Text,
    Code,
    Error,
}

/// One content section identified by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedContent {
    #[serde(rename = "type")]
    pub kind: ParsedContentKind,
    pub content: String,
    /// Language for code sections.
    #[serde(default)]
    pub language: Option<String>,
}

impl ParsedContent {
    /// Convert into an SDK content block.
    #[must_use]
    pub fn into_block(self) -> ContentBlock {
        match self.kind {
            ParsedContentKind::Text => ContentBlock::text(self.content),
            ParsedContentKind::Code => ContentBlock::code(self.content, self.language),
            ParsedContentKind::Error => ContentBlock::text(format!("Error: {}", self.content)),
        }
    }
}

/// Structured representation of CLI output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    /// Content sections in output order.
    pub contents: Vec<ParsedContent>,
    pub has_code: bool,
    pub has_error: bool,
    /// Brief summary of the response.
    pub summary: String,
}

impl ParsedResponse {
    /// Decode and validate a model reply.
    ///
    /// # Errors
    ///
    /// Returns `AiError::EmptyResponse` for null or blank replies and
    /// `AiError::ParseError` for anything that does not match the schema.
    pub fn from_reply(reply: ModelReply) -> Result<Self, AiError> {
        let parsed: Self = match reply {
            ModelReply::Structured(serde_json::Value::Null) => return Err(AiError::EmptyResponse),
            ModelReply::Structured(value) => serde_json::from_value(value)
                .map_err(|e| AiError::ParseError(format!("Schema mismatch: {e}")))?,
            ModelReply::Text(text) if text.trim().is_empty() => return Err(AiError::EmptyResponse),
            ModelReply::Text(text) => match serde_json::from_str(text.trim()) {
                Ok(parsed) => parsed,
                Err(_) => extract_json(&text)?,
            },
        };
        parsed.validate()
    }

    fn validate(self) -> Result<Self, AiError> {
        let len = self.summary.chars().count();
        if len > SUMMARY_MAX_CHARS {
            return Err(AiError::ParseError(format!(
                "Summary exceeds {SUMMARY_MAX_CHARS} characters ({len})"
            )));
        }
        Ok(self)
    }

    /// Convert the sections into content blocks, preserving order.
    #[must_use]
    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.contents
            .iter()
            .cloned()
            .map(ParsedContent::into_block)
            .collect()
    }

    /// JSON schema sent with the request, in the Gemini `responseSchema` dialect.
    #[must_use]
    pub fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "contents": {
                    "type": "ARRAY",
                    "description": "List of content blocks in order",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "type": { "type": "STRING", "enum": ["text", "code", "error"] },
                            "content": { "type": "STRING" },
                            "language": {
                                "type": "STRING",
                                "nullable": true,
                                "description": "Language for code blocks"
                            }
                        },
                        "required": ["type", "content"]
                    }
                },
                "has_code": {
                    "type": "BOOLEAN",
                    "description": "Whether the response contains code blocks"
                },
                "has_error": {
                    "type": "BOOLEAN",
                    "description": "Whether the response indicates an error"
                },
                "summary": {
                    "type": "STRING",
                    "description": "Brief summary of the response",
                    "maxLength": SUMMARY_MAX_CHARS
                }
            },
            "required": ["contents", "has_code", "has_error", "summary"],
            "propertyOrdering": ["contents", "has_code", "has_error", "summary"]
        })
    }
}
