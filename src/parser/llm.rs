//! Model-backed parser turning CLI text into SDK messages.

use std::sync::Arc;

use chrono::Utc;

use super::{
    clean_output, format_parse_request, is_simple, AiProvider, ParseCache, ParsedResponse,
    Provider, PARSER_SYSTEM_PROMPT,
};
use crate::config::{EnvSnapshot, ParserConfig};
use crate::error::SdkError;
use crate::types::{
    ContentBlock, Message, ResultMessage, SUBTYPE_ERROR, SUBTYPE_PARSING_FALLBACK, SUBTYPE_SUCCESS,
};

/// Generate a coarse, time-based session identifier.
#[must_use]
pub fn generate_session_id() -> String {
    format!("gemini-{}", Utc::now().timestamp())
}

/// Parser that asks a model to structure plain CLI output.
#[derive(Clone)]
pub struct LlmParser {
    provider: Arc<dyn AiProvider>,
    cache: Arc<ParseCache>,
}

impl std::fmt::Debug for LlmParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmParser")
            .field("cache_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl LlmParser {
    /// Create a parser using the shared cache.
    #[must_use]
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self::with_cache(provider, ParseCache::shared())
    }

    /// Create a parser with a specific cache.
    #[must_use]
    pub fn with_cache(provider: Arc<dyn AiProvider>, cache: Arc<ParseCache>) -> Self {
        Self { provider, cache }
    }

    /// Create a parser for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Configuration` if no API key is set.
    pub fn from_config(config: &ParserConfig, env: &EnvSnapshot) -> Result<Self, SdkError> {
        let api_key = config.resolve_api_key(env)?;
        tracing::debug!(provider = ?config.provider, model = %config.model, "Creating output parser");
        Ok(Self::new(Arc::new(Provider::from_config(config, api_key))))
    }

    /// Clean raw CLI output and parse it.
    pub async fn parse(&self, raw_output: &str, stderr: &str) -> Vec<Message> {
        let cleaned = clean_output(raw_output);
        self.parse_cleaned(&cleaned, stderr).await
    }

    /// Parse already-cleaned output.
    ///
    /// Never fails: when structured parsing is unavailable the whole text is
    /// returned as a single text block with a `parsing_fallback` result.
    pub async fn parse_cleaned(&self, cleaned: &str, stderr: &str) -> Vec<Message> {
        if let Some(cached) = self.cache.get(cleaned) {
            if !cached.is_empty() {
                tracing::trace!("Parse cache hit");
                return cached;
            }
        }

        if cleaned.trim().is_empty() {
            return Vec::new();
        }

        if is_simple(cleaned) {
            tracing::debug!("Simple response, skipping structured parse");
            return vec![Message::assistant(vec![ContentBlock::text(cleaned.trim())])];
        }

        match self.parse_with_llm(cleaned, stderr).await {
            Ok(parsed) => Self::messages_from(parsed),
            Err(e) => {
                tracing::error!(error = %e, cause = ?std::error::Error::source(&e), "LLM parsing failed, using raw output");
                Self::fallback(cleaned)
            }
        }
    }

    async fn parse_with_llm(&self, output: &str, stderr: &str) -> Result<ParsedResponse, SdkError> {
        let request = format_parse_request(output, stderr);
        let wrap = |source| SdkError::Parsing {
            message: "Gemini parsing failed".to_string(),
            raw_output: output.to_string(),
            source,
        };

        let reply = self
            .provider
            .generate_structured(PARSER_SYSTEM_PROMPT, &request, &ParsedResponse::schema())
            .await
            .map_err(wrap)?;

        ParsedResponse::from_reply(reply).map_err(wrap)
    }

    fn messages_from(parsed: ParsedResponse) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);

        let blocks: Vec<ContentBlock> = parsed
            .blocks()
            .into_iter()
            .filter(|block| !block.is_empty())
            .collect();
        if !blocks.is_empty() {
            messages.push(Message::assistant(blocks));
        }

        let subtype = if parsed.has_error {
            SUBTYPE_ERROR
        } else {
            SUBTYPE_SUCCESS
        };
        let summary = (!parsed.has_error).then_some(parsed.summary);
        messages.push(Message::Result(
            ResultMessage::new(subtype, parsed.has_error, generate_session_id()).with_result(summary),
        ));
        messages
    }

    fn fallback(cleaned: &str) -> Vec<Message> {
        vec![
            Message::assistant(vec![ContentBlock::text(cleaned)]),
            Message::Result(ResultMessage::new(
                SUBTYPE_PARSING_FALLBACK,
                false,
                generate_session_id(),
            )),
        ]
    }
}
