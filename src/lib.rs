//! Gemini CLI SDK - Claude Code SDK compatible client for the Gemini CLI.
//!
//! The Gemini CLI prints plain text. This crate runs it, strips its banner
//! lines, structures the answer with a schema-constrained model call (or a
//! fast path for trivial answers) and yields the same message sequence the
//! Claude Code SDK produces: `System`, `User`, `Assistant`, `Result`.
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use gemini_cli_sdk::{query, ContentBlock, GeminiOptions, Message};
//!
//! let options = GeminiOptions { model: Some("gemini-2.0-flash".into()), ..Default::default() };
//! let mut stream = query("Write a factorial function in Python", Some(options))?;
//! while let Some(message) = stream.next().await {
//!     if let Message::Assistant(assistant) = message? {
//!         for block in assistant.content {
//!             if let ContentBlock::Code { code, language } = block {
//!                 println!("{language}:\n{code}");
//!             }
//!         }
//!     }
//! }
//! ```

pub mod assembler;
pub mod cli;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod parser;
pub mod types;

pub use client::{GeminiClient, QueryStream};
pub use config::SdkConfig;
pub use error::{ClaudeSdkError, Result, SdkError};
pub use types::{
    AssistantMessage, ClaudeCodeOptions, ContentBlock, GeminiOptions, Message, PermissionMode,
    ResultMessage, SystemMessage, ToolResultContent, UserMessage,
};

/// Query the Gemini CLI.
///
/// Loads configuration from the config file and the environment, then starts
/// the query. `None` options mean `GeminiOptions::default()`.
///
/// # Errors
///
/// Returns `SdkError::Configuration` if the parser API key is missing and
/// `SdkError::Config` if a config file is invalid. Both are raised before
/// any process is spawned.
pub fn query(prompt: impl Into<String>, options: Option<GeminiOptions>) -> Result<QueryStream> {
    let client = GeminiClient::from_env()?;
    Ok(client.query(prompt, options))
}
