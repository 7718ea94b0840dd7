//! Fast-path detection of responses that need no structured parsing.

use std::sync::OnceLock;

use regex::Regex;

/// Single-line responses shorter than this skip the model call.
pub const SIMPLE_RESPONSE_MAX_CHARS: usize = 100;

const CODE_FENCE: &str = "```";

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\d\s+\-*/=.,]+$").expect("numeric pattern is valid"))
}

/// Returns true for short single-line text or bare numeric/arithmetic answers.
#[must_use]
pub fn is_simple(text: &str) -> bool {
    if !text.contains('\n')
        && !text.contains(CODE_FENCE)
        && text.chars().count() < SIMPLE_RESPONSE_MAX_CHARS
    {
        return true;
    }

    numeric_pattern().is_match(text.trim())
}
