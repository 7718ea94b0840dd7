//! Client facade driving the CLI, the parser and the assembler.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::assembler::MessageAssembler;
use crate::cli::run_gemini;
use crate::config::{ConfigLoader, EnvSnapshot, SdkConfig};
use crate::error::{Result, SdkError};
use crate::parser::{clean_output, LlmParser};
use crate::types::{GeminiOptions, Message};

/// Capacity of the per-query message channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 16;

/// Client for running queries against the Gemini CLI.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: Arc<SdkConfig>,
    parser: LlmParser,
}

impl GeminiClient {
    /// Create a client, reading credentials from the current environment.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Configuration` if the parser API key is missing.
    pub fn from_config(config: SdkConfig) -> Result<Self> {
        Self::from_config_with_env(config, &EnvSnapshot::capture())
    }

    /// Create a client from explicit configuration and environment.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Configuration` if the parser API key is missing.
    pub fn from_config_with_env(config: SdkConfig, env: &EnvSnapshot) -> Result<Self> {
        let parser = LlmParser::from_config(&config.parser, env)?;
        Ok(Self::with_parser(config, parser))
    }

    /// Load configuration files and the environment, then create a client.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` for unreadable config files and
    /// `SdkError::Configuration` if the parser API key is missing.
    pub fn from_env() -> Result<Self> {
        let env = EnvSnapshot::capture();
        let config = ConfigLoader::new().load_with_env(&env)?;
        Self::from_config_with_env(config, &env)
    }

    /// Create a client with a ready-made parser.
    #[must_use]
    pub fn with_parser(config: SdkConfig, parser: LlmParser) -> Self {
        Self {
            config: Arc::new(config),
            parser,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Start a query and stream its messages.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// stream cancels the query and terminates the CLI process.
    #[must_use]
    pub fn query(&self, prompt: impl Into<String>, options: Option<GeminiOptions>) -> QueryStream {
        self.query_with_cancel(prompt, options, CancellationToken::new())
    }

    /// Start a query that also stops when `cancel` fires.
    #[must_use]
    pub fn query_with_cancel(
        &self,
        prompt: impl Into<String>,
        options: Option<GeminiOptions>,
        cancel: CancellationToken,
    ) -> QueryStream {
        let prompt = prompt.into();
        let options = options.unwrap_or_default();
        // Dropping the stream cancels only this child token.
        let cancel = cancel.child_token();
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let client = self.clone();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            match client.run_query(&prompt, &options, &task_cancel).await {
                Ok(messages) => {
                    for message in messages {
                        if tx.send(Ok(message)).await.is_err() {
                            tracing::debug!("Query stream dropped before completion");
                            break;
                        }
                    }
                }
                Err(SdkError::Cancelled) => tracing::debug!("Query cancelled"),
                Err(e) => {
                    tracing::debug!(error = %e, "Query failed");
                    let _ = tx.send(Err(e)).await;
                }
            }
        });

        QueryStream {
            inner: ReceiverStream::new(rx),
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    /// Run one query to completion and return the assembled messages.
    ///
    /// # Errors
    ///
    /// Returns CLI and process errors unchanged; parsing failures never
    /// surface here.
    pub async fn run_query(
        &self,
        prompt: &str,
        options: &GeminiOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<Message>> {
        let started = Instant::now();
        let output = run_gemini(prompt, options, &self.config.cli, cancel).await?;

        let cleaned = clean_output(&output.stdout);
        let parsed = tokio::select! {
            parsed = self.parser.parse_cleaned(&cleaned, &output.stderr) => parsed,
            () = cancel.cancelled() => return Err(SdkError::Cancelled),
        };

        let messages = MessageAssembler::new(prompt, options)
            .include_system(self.config.include_system_message)
            .assemble(parsed, started.elapsed());
        tracing::info!(
            messages = messages.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Query complete"
        );
        Ok(messages)
    }
}

/// Single-use stream of messages for one query.
///
/// Backed by a Tokio task and channel. The stream ends after the `Result`
/// message, or after a single error item if the CLI could not be run.
#[derive(Debug)]
pub struct QueryStream {
    inner: ReceiverStream<Result<Message>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl QueryStream {
    /// Cancel the query, terminating the CLI process if still running.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Collect every message, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the stream.
    pub async fn collect_messages(mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        while let Some(item) = self.next().await {
            messages.push(item?);
        }
        Ok(messages)
    }
}

impl Stream for QueryStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
