//! Query options, shape-compatible with `ClaudeCodeOptions`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Permission modes accepted for Claude SDK compatibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    #[default]
    Default,
    AcceptEdits,
    BypassPermissions,
}

impl PermissionMode {
    /// Wire name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Options for a single query.
///
/// Every field has a safe default. Tool lists, turn limits, session
/// continuation and MCP settings are accepted for compatibility and passed
/// through where the Gemini CLI has an equivalent; otherwise they are advisory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiOptions {
    /// Backend model; the CLI default is used when unset.
    pub model: Option<String>,
    /// Instruction text placed before the prompt.
    pub system_prompt: Option<String>,
    /// Additional instruction text placed after `system_prompt`.
    pub append_system_prompt: Option<String>,

    pub sandbox: bool,
    pub sandbox_image: Option<String>,
    pub debug: bool,
    pub all_files: bool,
    /// Auto-accept all actions.
    pub yolo: bool,
    pub checkpointing: bool,
    pub extensions: Option<Vec<String>>,

    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub permission_mode: Option<PermissionMode>,
    pub max_turns: Option<u32>,
    /// Not used by Gemini.
    pub max_thinking_tokens: u32,

    pub continue_conversation: bool,
    pub resume: Option<String>,

    pub mcp_servers: HashMap<String, serde_json::Value>,
    pub allowed_mcp_server_names: Option<Vec<String>>,

    /// Working directory for the CLI process.
    pub cwd: Option<PathBuf>,

    pub permission_prompt_tool_name: Option<String>,
}

impl Default for GeminiOptions {
    fn default() -> Self {
        Self {
            model: None,
            system_prompt: None,
            append_system_prompt: None,
            sandbox: false,
            sandbox_image: None,
            debug: false,
            all_files: false,
            yolo: false,
            checkpointing: false,
            extensions: None,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            permission_mode: None,
            max_turns: None,
            max_thinking_tokens: 8000,
            continue_conversation: false,
            resume: None,
            mcp_servers: HashMap::new(),
            allowed_mcp_server_names: None,
            cwd: None,
            permission_prompt_tool_name: None,
        }
    }
}

impl GeminiOptions {
    /// True when every action should be accepted without confirmation.
    #[must_use]
    pub fn auto_accept(&self) -> bool {
        self.yolo || self.permission_mode == Some(PermissionMode::BypassPermissions)
    }
}

/// Alias kept so call sites written against the Claude Code SDK compile unchanged.
pub type ClaudeCodeOptions = GeminiOptions;
