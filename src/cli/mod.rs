//! CLI module for Gemini CLI process spawning.

mod process;

pub use process::*;
