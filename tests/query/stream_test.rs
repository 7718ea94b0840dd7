//! Tests for the query message stream.

use std::time::Duration;

use futures_util::StreamExt;
use gemini_cli_sdk::config::{EnvSnapshot, SdkConfig};
use gemini_cli_sdk::{ContentBlock, GeminiClient, GeminiOptions, Message, SdkError};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{client, client_with, ScriptedModel};

fn kinds(messages: &[Message]) -> Vec<&'static str> {
    messages.iter().map(Message::kind).collect()
}

#[tokio::test]
async fn simple_answer_skips_parser_model() {
    let model = ScriptedModel::failing();
    let messages = client("echo 4", model.clone())
        .query("What is 2 + 2?", None)
        .collect_messages()
        .await
        .unwrap();

    assert_eq!(kinds(&messages), vec!["system", "user", "assistant", "result"]);
    assert_eq!(
        messages[2].as_assistant().unwrap().content,
        vec![ContentBlock::text("4")]
    );
    let result = messages[3].as_result().unwrap();
    assert_eq!(result.subtype, "success");
    assert!(!result.is_error);
    assert!(result.session_id.starts_with("gemini-"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn banner_lines_are_removed() {
    let script = "echo 'Using GEMINI_API_KEY from environment'; echo 'Loaded cached credentials'; echo 'Paris'";
    let messages = client(script, ScriptedModel::failing())
        .query("Capital of France?", None)
        .collect_messages()
        .await
        .unwrap();

    // "Loaded cached credentials" is not a banner marker, so two lines remain.
    let assistant = messages[2].as_assistant().unwrap();
    assert_eq!(assistant.text(), "Loaded cached credentials\nParis");
}

#[tokio::test]
async fn structured_reply_becomes_blocks() {
    let model = ScriptedModel::replying(json!({
        "contents": [
            {"type": "text", "content": "Here is a factorial function:"},
            {"type": "code", "content": "def f(n):\n    return 1 if n < 2 else n * f(n - 1)", "language": "python"}
        ],
        "has_code": true,
        "has_error": false,
        "summary": "Factorial in Python"
    }));
    let script = r"printf 'Here is a factorial function:\n```python\ndef f(n): ...\n```\n'";
    let messages = client(script, model.clone())
        .query("Write a factorial function in Python", None)
        .collect_messages()
        .await
        .unwrap();

    assert_eq!(kinds(&messages), vec!["system", "user", "assistant", "result"]);
    let assistant = messages[2].as_assistant().unwrap();
    assert_eq!(assistant.content.len(), 2);
    match &assistant.content[1] {
        ContentBlock::Code { code, language } => {
            assert_eq!(language, "python");
            assert!(code.starts_with("def f(n):"));
        }
        other => panic!("Expected code block, got {other:?}"),
    }
    let result = messages[3].as_result().unwrap();
    assert_eq!(result.subtype, "success");
    assert_eq!(result.result.as_deref(), Some("Factorial in Python"));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn error_reply_marks_result() {
    let model = ScriptedModel::replying(json!({
        "contents": [{"type": "error", "content": "quota exceeded"}],
        "has_code": false,
        "has_error": true,
        "summary": "Request failed"
    }));
    let messages = client("printf 'Something went wrong.\\nQuota exceeded.\\n'", model)
        .query("hi", None)
        .collect_messages()
        .await
        .unwrap();

    let assistant = messages[2].as_assistant().unwrap();
    assert_eq!(assistant.content, vec![ContentBlock::text("Error: quota exceeded")]);
    let result = messages[3].as_result().unwrap();
    assert_eq!(result.subtype, "error");
    assert!(result.is_error);
}

#[tokio::test]
async fn parser_failure_falls_back_to_raw_text() {
    let script = "printf 'line one\\nline two\\n'";
    let messages = client(script, ScriptedModel::failing())
        .query("hi", None)
        .collect_messages()
        .await
        .unwrap();

    assert_eq!(kinds(&messages), vec!["system", "user", "assistant", "result"]);
    assert_eq!(
        messages[2].as_assistant().unwrap().content,
        vec![ContentBlock::text("line one\nline two")]
    );
    let result = messages[3].as_result().unwrap();
    assert_eq!(result.subtype, "parsing_fallback");
    assert!(!result.is_error);
}

#[tokio::test]
async fn empty_output_still_ends_with_result() {
    let messages = client("true", ScriptedModel::failing())
        .query("hi", None)
        .collect_messages()
        .await
        .unwrap();

    assert_eq!(kinds(&messages), vec!["system", "user", "result"]);
}

#[tokio::test]
async fn system_message_can_be_disabled() {
    let client = client_with("echo ok", ScriptedModel::failing(), |config| {
        config.include_system_message = false;
    });
    let messages = client.query("hi", None).collect_messages().await.unwrap();

    assert_eq!(kinds(&messages), vec!["user", "assistant", "result"]);
}

#[tokio::test]
async fn user_message_echoes_prompt_and_system_prompt_reaches_cli() {
    let options = GeminiOptions {
        system_prompt: Some("Be brief.".into()),
        model: Some("gemini-2.5-pro".into()),
        ..Default::default()
    };
    let client = client(r#"printf '%s' "$2" | tr '\n' ' '"#, ScriptedModel::failing());
    let messages = client
        .query("Hello", Some(options))
        .collect_messages()
        .await
        .unwrap();

    let Message::System(system) = &messages[0] else {
        panic!("Expected system message");
    };
    assert_eq!(system.data["model"], "gemini-2.5-pro");
    assert_eq!(
        messages[1],
        Message::User(gemini_cli_sdk::UserMessage {
            content: "Hello".into()
        })
    );
    assert_eq!(messages[2].as_assistant().unwrap().text(), "Be brief.  Hello");
}

#[tokio::test]
async fn process_failure_is_only_item() {
    let mut stream = client("echo 'model not found' >&2; exit 1", ScriptedModel::failing())
        .query("hi", None);

    match stream.next().await {
        Some(Err(SdkError::Process { exit_code, stderr })) => {
            assert_eq!(exit_code, Some(1));
            assert!(stderr.contains("model not found"));
        }
        other => panic!("Expected process error, got {other:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn missing_cli_is_reported() {
    let client = client_with("true", ScriptedModel::failing(), |config| {
        config.cli.binary = "gemini-binary-that-does-not-exist".into();
        config.cli.prefix_args.clear();
    });
    let err = client.query("hi", None).collect_messages().await.unwrap_err();
    assert!(matches!(err, SdkError::CliNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn timeout_is_reported() {
    let client = client_with("exec sleep 30", ScriptedModel::failing(), |config| {
        config.cli.timeout_secs = Some(1);
    });
    let err = client.query("hi", None).collect_messages().await.unwrap_err();
    assert!(matches!(err, SdkError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn resume_id_becomes_session_id() {
    let options = GeminiOptions {
        resume: Some("session-123".into()),
        ..Default::default()
    };
    let messages = client("echo ok", ScriptedModel::failing())
        .query("hi", Some(options))
        .collect_messages()
        .await
        .unwrap();

    assert_eq!(messages.last().unwrap().as_result().unwrap().session_id, "session-123");
}

#[tokio::test]
async fn external_cancel_ends_stream_without_items() {
    let cancel = CancellationToken::new();
    let mut stream = client("exec sleep 30", ScriptedModel::failing()).query_with_cancel(
        "hi",
        None,
        cancel.clone(),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let next = tokio::time::timeout(Duration::from_secs(10), stream.next())
        .await
        .expect("stream should end after cancellation");
    assert!(next.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn dropping_stream_terminates_cli() {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());
    let stream = client(&script, ScriptedModel::failing()).query("hi", None);

    let pid = loop {
        if let Ok(text) = std::fs::read_to_string(&pid_file) {
            if let Ok(pid) = text.trim().parse::<i32>() {
                break pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    drop(stream);

    let pid = Pid::from_raw(pid);
    for _ in 0..200 {
        if kill(pid, None::<Signal>) == Err(Errno::ESRCH) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("CLI process {pid} still running after the stream was dropped");
}

#[test]
fn missing_api_key_is_configuration_error() {
    let err = GeminiClient::from_config_with_env(SdkConfig::default(), &EnvSnapshot::default())
        .unwrap_err();

    match err {
        SdkError::Configuration { missing_key, .. } => {
            assert_eq!(missing_key, "GEMINI_API_KEY or GOOGLE_API_KEY");
        }
        other => panic!("Expected configuration error, got {other:?}"),
    }
}

#[test]
fn api_key_from_environment_creates_client() {
    let env = EnvSnapshot::from_pairs([("GOOGLE_API_KEY", "test-key")]);
    let client = GeminiClient::from_config_with_env(SdkConfig::default(), &env).unwrap();
    assert_eq!(client.config().cli.binary, "gemini");
}
