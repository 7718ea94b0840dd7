//! Model providers for the structured output call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::{ParserConfig, ProviderKind};

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Build an HTTP client with proper timeout configuration.
fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        })
}

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    (500..600).contains(&status_code)
}

/// Calculate exponential backoff duration for retry attempts.
fn calculate_backoff(attempt: u32) -> Duration {
    // 1s, 2s, 4s
    Duration::from_secs(1 << attempt)
}

/// Errors from model provider calls.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error("Model request timed out")]
    Timeout,
}

/// Reply from a structured output call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Already-decoded JSON value.
    Structured(serde_json::Value),
    /// Text expected to contain a JSON document.
    Text(String),
}

/// A model that can answer with output constrained to a JSON schema.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a reply conforming to `schema`.
    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
    ) -> Result<ModelReply, AiError>;
}

fn map_send_error(e: &reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else {
        AiError::RequestFailed(e.to_string())
    }
}

/// Send a JSON request, retrying 5xx responses with backoff.
async fn post_with_retry(
    request: impl Fn() -> reqwest::RequestBuilder + Send + Sync,
) -> Result<serde_json::Value, AiError> {
    let mut attempt = 0;
    loop {
        let response = request().send().await.map_err(|e| map_send_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AiError::ParseError(e.to_string()));
        }

        let status_code = status.as_u16();
        if should_retry(status_code, attempt) {
            let backoff = calculate_backoff(attempt);
            tracing::debug!(status = status_code, ?backoff, attempt, "Retrying model request");
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }

        let text = response.text().await.unwrap_or_default();
        return Err(AiError::RequestFailed(format!("HTTP {status}: {text}")));
    }
}

/// Gemini API provider using native structured output.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    #[must_use]
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }

    fn request_body(&self, system: &str, user: &str, schema: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": user }]
            }],
            "systemInstruction": {
                "parts": [{ "text": system }]
            },
            "generationConfig": {
                "maxOutputTokens": self.max_tokens,
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        })
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
    ) -> Result<ModelReply, AiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = self.request_body(system, user, schema);

        let json = post_with_retry(|| {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(&body)
        })
        .await?;

        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|text| ModelReply::Text(text.to_string()))
            .ok_or_else(|| AiError::ParseError("No text in Gemini response".to_string()))
    }
}

/// Claude API provider. The schema is stated in the system prompt.
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeProvider {
    /// Create a new Claude provider.
    #[must_use]
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl AiProvider for ClaudeProvider {
    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
    ) -> Result<ModelReply, AiError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let system = format!(
            "{system}\n\nRespond with ONLY a JSON object matching this JSON schema:\n{schema}"
        );

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{
                "role": "user",
                "content": user
            }]
        });

        let json = post_with_retry(|| {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&body)
        })
        .await?;

        json["content"][0]["text"]
            .as_str()
            .map(|text| ModelReply::Text(text.to_string()))
            .ok_or_else(|| AiError::ParseError("No text in Claude response".to_string()))
    }
}

/// Provider enum for dispatch.
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini(GeminiProvider),
    Claude(ClaudeProvider),
}

impl Provider {
    /// Build the configured provider with an already-resolved API key.
    #[must_use]
    pub fn from_config(config: &ParserConfig, api_key: String) -> Self {
        match config.provider {
            ProviderKind::Gemini => Self::Gemini(GeminiProvider::new(
                config.api_base_url().to_string(),
                api_key,
                config.model.clone(),
                config.max_tokens,
            )),
            ProviderKind::Claude => Self::Claude(ClaudeProvider::new(
                config.api_base_url().to_string(),
                api_key,
                config.model.clone(),
                config.max_tokens,
            )),
        }
    }
}

#[async_trait]
impl AiProvider for Provider {
    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
    ) -> Result<ModelReply, AiError> {
        match self {
            Self::Gemini(p) => p.generate_structured(system, user, schema).await,
            Self::Claude(p) => p.generate_structured(system, user, schema).await,
        }
    }
}

/// Extract the first JSON object from response text.
///
/// Tolerates surrounding prose and markdown fences; braces inside JSON
/// strings do not affect matching.
///
/// # Errors
///
/// Returns `AiError::ParseError` if no JSON object is found or parsing fails.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let json_start = text
        .find('{')
        .ok_or_else(|| AiError::ParseError(format!("No JSON object found in response: {text}")))?;

    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut json_end = None;
    for (i, c) in text[json_start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    json_end = Some(json_start + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let json_end = json_end
        .ok_or_else(|| AiError::ParseError("Unterminated JSON object in response".to_string()))?;
    serde_json::from_str(&text[json_start..json_end])
        .map_err(|e| AiError::ParseError(format!("Failed to parse JSON: {e}")))
}
