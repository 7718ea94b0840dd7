//! Tests for Gemini process spawning and control.

use std::time::Duration;

use gemini_cli_sdk::cli::{run_gemini, GeminiProcess, GeminiProcessBuilder};
use gemini_cli_sdk::config::CliConfig;
use gemini_cli_sdk::{GeminiOptions, PermissionMode, SdkError};
use tokio_util::sync::CancellationToken;

/// Run `script` through `sh -c`; the generated CLI arguments land in `$1..`.
fn shell(script: &str) -> CliConfig {
    CliConfig {
        binary: "sh".to_string(),
        prefix_args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
        ..Default::default()
    }
}

#[test]
fn builder_new_creates_with_prompt() {
    let args = GeminiProcessBuilder::new("Fix the bug").build_args();
    assert_eq!(args, vec!["-p", "Fix the bug"]);
}

#[test]
fn builder_model_and_sandbox() {
    let args = GeminiProcessBuilder::new("task")
        .model("gemini-2.5-pro")
        .sandbox(true)
        .sandbox_image("ghcr.io/example/sandbox:1")
        .build_args();

    assert_eq!(
        args,
        vec![
            "-p",
            "task",
            "-m",
            "gemini-2.5-pro",
            "--sandbox",
            "--sandbox-image",
            "ghcr.io/example/sandbox:1"
        ]
    );
}

#[test]
fn builder_flags() {
    let args = GeminiProcessBuilder::new("task")
        .yolo(true)
        .debug(true)
        .all_files(true)
        .checkpointing(true)
        .build_args();

    assert!(args.contains(&"--yolo".to_string()));
    assert!(args.contains(&"--debug".to_string()));
    assert!(args.contains(&"--all-files".to_string()));
    assert!(args.contains(&"--checkpointing".to_string()));
}

#[test]
fn builder_extensions_repeat_flag() {
    let args = GeminiProcessBuilder::new("task")
        .extensions(&["git".to_string(), "web".to_string()])
        .build_args();

    assert_eq!(args[2..], ["--extensions", "git", "--extensions", "web"]);
}

#[test]
fn builder_bypass_permissions_means_yolo() {
    let options = GeminiOptions {
        permission_mode: Some(PermissionMode::BypassPermissions),
        ..Default::default()
    };
    let args = GeminiProcessBuilder::from_options("task", &options).build_args();
    assert!(args.contains(&"--yolo".to_string()));

    let options = GeminiOptions {
        permission_mode: Some(PermissionMode::AcceptEdits),
        ..Default::default()
    };
    let args = GeminiProcessBuilder::from_options("task", &options).build_args();
    assert!(!args.contains(&"--yolo".to_string()));
}

#[test]
fn builder_working_dir_from_options() {
    let options = GeminiOptions {
        cwd: Some("/tmp".into()),
        ..Default::default()
    };
    let builder = GeminiProcessBuilder::from_options("task", &options);
    assert_eq!(builder.get_working_dir(), Some(&std::path::PathBuf::from("/tmp")));
}

#[tokio::test]
async fn run_collects_stdout_and_stderr() {
    let config = shell("echo out; echo err >&2");
    let output = run_gemini("hi", &GeminiOptions::default(), &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.stdout, "out\n");
    assert_eq!(output.stderr, "err\n");
    assert_eq!(output.exit_code, 0);
}

#[tokio::test]
async fn run_passes_prompt_as_argument() {
    let config = shell(r#"printf '%s|%s' "$1" "$2""#);
    let output = run_gemini(
        "What is 2 + 2?",
        &GeminiOptions::default(),
        &config,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(output.stdout, "-p|What is 2 + 2?");
}

#[tokio::test]
async fn run_sets_sdk_marker_and_config_env() {
    let mut config = shell(r#"printf '%s %s' "$GEMINI_CODE_SDK" "$EXTRA_VAR""#);
    config.env.insert("EXTRA_VAR".into(), "extra".into());

    let output = run_gemini("hi", &GeminiOptions::default(), &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.stdout, "rust extra");
}

#[tokio::test]
async fn run_uses_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let options = GeminiOptions {
        cwd: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let output = run_gemini("hi", &options, &shell("pwd -P"), &CancellationToken::new())
        .await
        .unwrap();

    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(output.stdout.trim(), expected.display().to_string());
}

#[tokio::test]
async fn run_missing_working_directory_fails_before_spawn() {
    let options = GeminiOptions {
        cwd: Some("/definitely/not/a/real/dir".into()),
        ..Default::default()
    };
    let err = run_gemini("hi", &options, &shell("true"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::CliConnection(_)), "got {err:?}");
}

#[tokio::test]
async fn run_non_zero_exit_is_process_error() {
    let config = shell("echo 'model not found' >&2; exit 1");
    let err = run_gemini("hi", &GeminiOptions::default(), &config, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        SdkError::Process { exit_code, stderr } => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr, "model not found\n");
        }
        other => panic!("Expected Process error, got {other:?}"),
    }
}

#[tokio::test]
async fn process_error_keeps_full_stderr() {
    let config = shell("printf '  warning\\n\\nfatal: quota\\n' >&2; exit 3");
    let err = run_gemini("hi", &GeminiOptions::default(), &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Gemini CLI exited with code 3: warning\n\nfatal: quota");
    match err {
        SdkError::Process { stderr, .. } => assert_eq!(stderr, "  warning\n\nfatal: quota\n"),
        other => panic!("Expected Process error, got {other:?}"),
    }
}

#[tokio::test]
async fn spawn_missing_binary_is_cli_not_found() {
    let config = CliConfig {
        binary: "gemini-binary-that-does-not-exist".to_string(),
        ..Default::default()
    };
    let err = GeminiProcess::spawn(&config, &GeminiProcessBuilder::new("hi")).unwrap_err();
    assert!(matches!(err, SdkError::CliNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn run_times_out() {
    let mut config = shell("exec sleep 30");
    config.timeout_secs = Some(1);

    let started = std::time::Instant::now();
    let err = run_gemini("hi", &GeminiOptions::default(), &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SdkError::Timeout(d) if d == Duration::from_secs(1)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn run_cancellation_terminates_child() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = run_gemini("hi", &GeminiOptions::default(), &shell("exec sleep 30"), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SdkError::Cancelled), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
}
