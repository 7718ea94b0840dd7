//! Gemini CLI process spawning and output collection.
//!
//! [`GeminiProcessBuilder`] translates [`GeminiOptions`] into command-line
//! arguments. [`GeminiProcess`] runs the CLI to completion, collecting stdout
//! and stderr, and terminates the child on cancellation or timeout.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

use crate::config::CliConfig;
use crate::error::SdkError;
use crate::types::GeminiOptions;

/// Environment variable telling the CLI which SDK launched it.
pub const SDK_ENV_MARKER: &str = "GEMINI_CODE_SDK";

/// Value of [`SDK_ENV_MARKER`].
pub const SDK_ENV_VALUE: &str = "rust";

/// Grace period between SIGTERM and SIGKILL.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Complete output of a finished CLI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Builder for Gemini CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct GeminiProcessBuilder {
    prompt: String,
    model: Option<String>,
    sandbox: bool,
    sandbox_image: Option<String>,
    yolo: bool,
    debug: bool,
    all_files: bool,
    checkpointing: bool,
    extensions: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl GeminiProcessBuilder {
    /// Create a new builder with the given prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Build from query options.
    ///
    /// System prompts are placed in front of the prompt text since the CLI
    /// has no separate flag for them.
    #[must_use]
    pub fn from_options(prompt: &str, options: &GeminiOptions) -> Self {
        let full_prompt = [
            options.system_prompt.as_deref(),
            options.append_system_prompt.as_deref(),
            Some(prompt),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

        let mut builder = Self::new(full_prompt)
            .sandbox(options.sandbox)
            .yolo(options.auto_accept())
            .debug(options.debug)
            .all_files(options.all_files)
            .checkpointing(options.checkpointing);

        if let Some(model) = &options.model {
            builder = builder.model(model.clone());
        }
        if let Some(image) = &options.sandbox_image {
            builder = builder.sandbox_image(image.clone());
        }
        if let Some(extensions) = &options.extensions {
            builder = builder.extensions(extensions);
        }
        if let Some(dir) = &options.cwd {
            builder = builder.working_dir(dir.clone());
        }
        if !options.allowed_tools.is_empty() || !options.disallowed_tools.is_empty() {
            tracing::debug!(
                allowed = ?options.allowed_tools,
                disallowed = ?options.disallowed_tools,
                "Tool lists are advisory for the Gemini CLI"
            );
        }
        builder
    }

    /// Select the backend model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Run inside the CLI sandbox.
    #[must_use]
    pub fn sandbox(mut self, enabled: bool) -> Self {
        self.sandbox = enabled;
        self
    }

    /// Sandbox image URI.
    #[must_use]
    pub fn sandbox_image(mut self, image: impl Into<String>) -> Self {
        self.sandbox_image = Some(image.into());
        self
    }

    /// Auto-accept all actions.
    #[must_use]
    pub fn yolo(mut self, enabled: bool) -> Self {
        self.yolo = enabled;
        self
    }

    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    #[must_use]
    pub fn all_files(mut self, enabled: bool) -> Self {
        self.all_files = enabled;
        self
    }

    #[must_use]
    pub fn checkpointing(mut self, enabled: bool) -> Self {
        self.checkpointing = enabled;
        self
    }

    /// Extensions to load.
    #[must_use]
    pub fn extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions.to_vec();
        self
    }

    /// Set the working directory for the CLI process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Get the working directory, if set.
    #[must_use]
    pub fn get_working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    /// Get the prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Build the command-line arguments.
    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-p".to_string(), self.prompt.clone()];

        if let Some(model) = &self.model {
            args.push("-m".to_string());
            args.push(model.clone());
        }

        if self.sandbox {
            args.push("--sandbox".to_string());
        }

        if let Some(image) = &self.sandbox_image {
            args.push("--sandbox-image".to_string());
            args.push(image.clone());
        }

        if self.yolo {
            args.push("--yolo".to_string());
        }

        if self.debug {
            args.push("--debug".to_string());
        }

        if self.all_files {
            args.push("--all-files".to_string());
        }

        if self.checkpointing {
            args.push("--checkpointing".to_string());
        }

        for extension in &self.extensions {
            args.push("--extensions".to_string());
            args.push(extension.clone());
        }

        args
    }
}

/// A running Gemini CLI process.
#[derive(Debug)]
pub struct GeminiProcess {
    child: Child,
}

enum Outcome {
    Finished(std::io::Result<(Vec<u8>, Vec<u8>, ExitStatus)>),
    Cancelled,
    TimedOut(Duration),
}

impl GeminiProcess {
    /// Spawn the CLI described by `config` with the builder's arguments.
    ///
    /// The child is killed if this handle is dropped before it exits.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::CliNotFound` if the executable does not exist and
    /// `SdkError::CliConnection` for other spawn failures.
    pub fn spawn(config: &CliConfig, builder: &GeminiProcessBuilder) -> Result<Self, SdkError> {
        if let Some(dir) = &builder.working_dir {
            if !dir.is_dir() {
                return Err(SdkError::CliConnection(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        let mut cmd = Command::new(&config.binary);
        cmd.args(&config.prefix_args)
            .args(builder.build_args())
            .env(SDK_ENV_MARKER, SDK_ENV_VALUE)
            .envs(&config.env)
            .envs(&builder.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &builder.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            binary = %config.binary,
            model = ?builder.model,
            cwd = ?builder.working_dir,
            "Spawning Gemini CLI"
        );

        let child = cmd
            .spawn()
            .map_err(|e| SdkError::from_spawn(&config.binary, e))?;

        Ok(Self { child })
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Collect all output and wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Process` on non-zero exit, `SdkError::Cancelled` or
    /// `SdkError::Timeout` after terminating the child, and
    /// `SdkError::CliConnection` if the pipes fail.
    pub async fn run(
        mut self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, SdkError> {
        let mut stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| SdkError::CliConnection("stdout not captured".into()))?;
        let mut stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| SdkError::CliConnection("stderr not captured".into()))?;

        let outcome = tokio::select! {
            res = collect(&mut self.child, &mut stdout, &mut stderr) => Outcome::Finished(res),
            () = cancel.cancelled() => Outcome::Cancelled,
            elapsed = deadline(timeout) => Outcome::TimedOut(elapsed),
        };

        match outcome {
            Outcome::Finished(Ok((out, err, status))) => {
                let stdout = String::from_utf8_lossy(&out).into_owned();
                let stderr = String::from_utf8_lossy(&err).into_owned();
                if status.success() {
                    tracing::debug!(
                        stdout_bytes = out.len(),
                        stderr_bytes = err.len(),
                        "Gemini CLI finished"
                    );
                    Ok(ProcessOutput {
                        stdout,
                        stderr,
                        exit_code: status.code().unwrap_or(0),
                    })
                } else {
                    tracing::warn!(exit_code = ?status.code(), "Gemini CLI failed");
                    Err(SdkError::Process {
                        exit_code: status.code(),
                        stderr,
                    })
                }
            }
            Outcome::Finished(Err(e)) => Err(SdkError::CliConnection(e.to_string())),
            Outcome::Cancelled => {
                tracing::debug!(pid = ?self.id(), "Query cancelled, terminating Gemini CLI");
                self.terminate().await;
                Err(SdkError::Cancelled)
            }
            Outcome::TimedOut(elapsed) => {
                tracing::warn!(timeout = ?elapsed, "Gemini CLI timed out, terminating");
                self.terminate().await;
                Err(SdkError::Timeout(elapsed))
            }
        }
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.graceful_terminate(DEFAULT_TERMINATE_TIMEOUT).await {
            tracing::warn!(error = %e, "Failed to terminate Gemini CLI");
        }
    }

    /// Attempt graceful termination with a timeout.
    ///
    /// On Unix, sends SIGTERM first, then SIGKILL after the timeout.
    /// On other platforms, falls back to immediate kill.
    ///
    /// # Errors
    ///
    /// Returns an error if termination fails.
    pub async fn graceful_terminate(&mut self, timeout: Duration) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            self.graceful_terminate_unix(timeout).await
        }

        #[cfg(not(unix))]
        {
            let _ = timeout;
            self.child.kill().await
        }
    }

    #[cfg(unix)]
    async fn graceful_terminate_unix(&mut self, timeout: Duration) -> std::io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.id() {
            let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
            let _ = kill(nix_pid, Signal::SIGTERM);

            match tokio::time::timeout(timeout, self.child.wait()).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(_) => self.child.kill().await,
            }
        } else {
            Ok(())
        }
    }
}

async fn collect(
    child: &mut Child,
    stdout: &mut ChildStdout,
    stderr: &mut ChildStderr,
) -> std::io::Result<(Vec<u8>, Vec<u8>, ExitStatus)> {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let (read_out, read_err) = tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
    read_out?;
    read_err?;
    let status = child.wait().await?;
    Ok((out, err, status))
}

async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}

/// Run the CLI once for `prompt` and return its complete output.
///
/// # Errors
///
/// See [`GeminiProcess::spawn`] and [`GeminiProcess::run`].
pub async fn run_gemini(
    prompt: &str,
    options: &GeminiOptions,
    config: &CliConfig,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, SdkError> {
    let builder = GeminiProcessBuilder::from_options(prompt, options);
    let process = GeminiProcess::spawn(config, &builder)?;
    process.run(cancel, config.timeout()).await
}
