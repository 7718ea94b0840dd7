//! Colored terminal display of query messages.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::error::Result;
use crate::types::{ContentBlock, Message, ResultMessage, SystemMessage, ToolResultContent};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to a maximum number of characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{head}...")
}

/// Format tool input for display, truncating long values.
#[must_use]
pub fn format_tool_input(input: &serde_json::Value, raw_mode: bool) -> String {
    match input {
        serde_json::Value::Object(map) => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    let value_str = match v {
                        serde_json::Value::String(s) => truncate(s, 50, raw_mode),
                        other => truncate(&other.to_string(), 50, raw_mode),
                    };
                    format!("{k}={value_str}")
                })
                .collect();
            pairs.join(", ")
        }
        other => truncate(&other.to_string(), DEFAULT_MAX_LEN, raw_mode),
    }
}

/// Print any message.
pub fn print_message(message: &Message, raw_mode: bool) {
    match message {
        Message::System(system) => print_system(system, raw_mode),
        Message::User(user) => {
            println!(
                "{} {} {}",
                timestamp().dimmed(),
                "[USER]".blue().bold(),
                truncate(&user.content, DEFAULT_MAX_LEN, raw_mode)
            );
        }
        Message::Assistant(assistant) => {
            for block in &assistant.content {
                print_block(block, raw_mode);
            }
        }
        Message::Result(result) => print_result(result, raw_mode),
    }
    let _ = io::stdout().flush();
}

fn print_system(system: &SystemMessage, raw_mode: bool) {
    let model = system
        .data
        .get("model")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("default");
    let cwd = system
        .data
        .get("cwd")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("-");
    println!(
        "{} {} {} model={}, cwd={}",
        timestamp().dimmed(),
        "[SYSTEM]".blue().bold(),
        system.subtype,
        model.cyan(),
        truncate(cwd, 40, raw_mode).dimmed()
    );
}

fn print_block(block: &ContentBlock, raw_mode: bool) {
    match block {
        ContentBlock::Text { text } => println!("{text}"),
        ContentBlock::Code { code, language } => {
            println!("{}", format!("```{language}").dimmed());
            println!("{code}");
            println!("{}", "```".dimmed());
        }
        ContentBlock::ToolUse { name, input, .. } => {
            println!(
                "{} {} ({})",
                "[TOOL]".cyan().bold(),
                name.bold(),
                format_tool_input(input, raw_mode).dimmed()
            );
        }
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let text = match content {
                Some(ToolResultContent::Text(text)) => text.clone(),
                Some(ToolResultContent::Parts(parts)) => {
                    serde_json::to_string(parts).unwrap_or_default()
                }
                None => String::new(),
            };
            let id_short = truncate(tool_use_id, 12, raw_mode);
            let content_short = truncate(&text, 150, raw_mode);
            if is_error.unwrap_or(false) {
                println!("{} {} {}", "[RESULT]".red().bold(), id_short.dimmed(), content_short);
            } else {
                println!("{} {} {}", "[RESULT]".green().bold(), id_short.dimmed(), content_short);
            }
        }
    }
}

fn print_result(result: &ResultMessage, raw_mode: bool) {
    let ts = timestamp();
    let session = format!("session_id={}", truncate(&result.session_id, 20, raw_mode));
    if result.is_error {
        println!(
            "{} {} Query ended with error ({}) {}",
            ts.dimmed(),
            "[RESULT]".red().bold(),
            result.subtype,
            session.dimmed()
        );
    } else if result.is_fallback() {
        println!(
            "{} {} Completed with raw output in {}ms {}",
            ts.dimmed(),
            "[RESULT]".yellow().bold(),
            result.duration_ms,
            session.dimmed()
        );
    } else {
        println!(
            "{} {} Completed in {}ms {}",
            ts.dimmed(),
            "[RESULT]".green().bold(),
            result.duration_ms,
            session.dimmed()
        );
    }
}

/// Encode a message as a single JSON line.
///
/// # Errors
///
/// Returns `SdkError::JsonDecode` if the message cannot be serialized.
pub fn json_line(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Print a message as one JSON line.
pub fn print_json_line(message: &Message) {
    match json_line(message) {
        Ok(line) => println!("{line}"),
        Err(e) => print_error(&format!("Failed to encode message: {e}")),
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
