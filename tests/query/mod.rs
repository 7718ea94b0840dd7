//! End-to-end query tests with a scripted CLI and a fake parser model.

mod stream_test;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gemini_cli_sdk::config::{CliConfig, SdkConfig};
use gemini_cli_sdk::parser::{AiError, AiProvider, LlmParser, ModelReply, ParseCache};
use gemini_cli_sdk::GeminiClient;

/// Parser model returning a fixed reply.
pub struct ScriptedModel {
    reply: Result<serde_json::Value, String>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn replying(value: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(value),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("service unavailable".to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiProvider for ScriptedModel {
    async fn generate_structured(
        &self,
        _system: &str,
        _user: &str,
        _schema: &serde_json::Value,
    ) -> Result<ModelReply, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .map(ModelReply::Structured)
            .map_err(AiError::RequestFailed)
    }
}

/// Client whose CLI is `sh -c script`.
pub fn client(script: &str, model: Arc<ScriptedModel>) -> GeminiClient {
    client_with(script, model, |_| {})
}

pub fn client_with(
    script: &str,
    model: Arc<ScriptedModel>,
    configure: impl FnOnce(&mut SdkConfig),
) -> GeminiClient {
    let mut config = SdkConfig {
        cli: CliConfig {
            binary: "sh".to_string(),
            prefix_args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };
    configure(&mut config);
    let parser = LlmParser::with_cache(model, Arc::new(ParseCache::seeded()));
    GeminiClient::with_parser(config, parser)
}
