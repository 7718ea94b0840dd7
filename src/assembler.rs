//! Final ordering of the messages a query yields.
//!
//! Output is always: optional `System`, `User` echo, zero or more
//! `Assistant` messages in parser order, and exactly one `Result`.

use std::time::Duration;

use crate::parser::generate_session_id;
use crate::types::{
    GeminiOptions, Message, PermissionMode, ResultMessage, SystemMessage, UserMessage,
    SUBTYPE_SUCCESS,
};

/// Builds the message sequence for one query.
#[derive(Debug, Clone)]
pub struct MessageAssembler<'a> {
    prompt: &'a str,
    options: &'a GeminiOptions,
    include_system: bool,
}

impl<'a> MessageAssembler<'a> {
    #[must_use]
    pub fn new(prompt: &'a str, options: &'a GeminiOptions) -> Self {
        Self {
            prompt,
            options,
            include_system: true,
        }
    }

    /// Whether to emit the leading system message.
    #[must_use]
    pub fn include_system(mut self, include: bool) -> Self {
        self.include_system = include;
        self
    }

    /// System `init` message describing the environment.
    #[must_use]
    pub fn system_message(&self) -> Message {
        let cwd = self
            .options
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .map(|p| p.display().to_string());

        let mut data = serde_json::Map::new();
        data.insert(
            "model".into(),
            self.options
                .model
                .clone()
                .map_or(serde_json::Value::Null, serde_json::Value::String),
        );
        data.insert(
            "cwd".into(),
            cwd.map_or(serde_json::Value::Null, serde_json::Value::String),
        );
        data.insert(
            "permission_mode".into(),
            self.options
                .permission_mode
                .unwrap_or(PermissionMode::Default)
                .as_str()
                .into(),
        );
        data.insert("sdk".into(), "rust".into());
        data.insert("version".into(), env!("CARGO_PKG_VERSION").into());

        Message::System(SystemMessage {
            subtype: "init".to_string(),
            data,
        })
    }

    /// Wrap parser output into the final sequence.
    ///
    /// A parser `Result` is kept (the last one if several) with its duration
    /// replaced by `elapsed`; otherwise a `success` result is synthesized.
    #[must_use]
    pub fn assemble(&self, parsed: Vec<Message>, elapsed: Duration) -> Vec<Message> {
        let mut messages = Vec::with_capacity(parsed.len() + 3);
        if self.include_system {
            messages.push(self.system_message());
        }
        messages.push(Message::User(UserMessage {
            content: self.prompt.to_string(),
        }));

        let mut result = None;
        let mut text = Vec::new();
        for message in parsed {
            match message {
                Message::Assistant(mut assistant) => {
                    assistant.content.retain(|block| !block.is_empty());
                    if assistant.content.is_empty() {
                        continue;
                    }
                    let part = assistant.text();
                    if !part.is_empty() {
                        text.push(part);
                    }
                    messages.push(Message::Assistant(assistant));
                }
                Message::Result(parsed_result) => result = Some(parsed_result),
                other @ (Message::System(_) | Message::User(_)) => messages.push(other),
            }
        }

        let result = result.unwrap_or_else(|| {
            let summary = (!text.is_empty()).then(|| text.join("\n"));
            ResultMessage::new(SUBTYPE_SUCCESS, false, generate_session_id()).with_result(summary)
        });
        let mut result =
            result.with_duration_ms(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        if let Some(session_id) = &self.options.resume {
            result = result.with_session_id(session_id.clone());
        }

        messages.push(Message::Result(result));
        messages
    }
}
