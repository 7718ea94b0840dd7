//! Output normalization: cleaning, fast-path detection and model-backed parsing.

mod cache;
mod classify;
mod clean;
mod llm;
mod prompts;
mod provider;
mod schema;

pub use cache::ParseCache;
pub use classify::{is_simple, SIMPLE_RESPONSE_MAX_CHARS};
pub use clean::{clean_output, NOISE_MARKERS};
pub use llm::{generate_session_id, LlmParser};
pub use prompts::{format_parse_request, PARSER_SYSTEM_PROMPT};
pub use provider::*;
pub use schema::{ParsedContent, ParsedContentKind, ParsedResponse, SUMMARY_MAX_CHARS};
