//! Prompts for the structured output call.

/// Instruction prompt describing the extraction task.
pub const PARSER_SYSTEM_PROMPT: &str = r"You are a parser for Gemini CLI output.
Extract structured information from the CLI output.

Identify:
1. Plain text responses
2. Code blocks (with language if specified) - look for ``` markers
3. Error messages or warnings
4. Multiple content sections if present

Be precise and preserve the exact content.";

/// Format the CLI output (and stderr, if any) for parsing.
#[must_use]
pub fn format_parse_request(output: &str, stderr: &str) -> String {
    let mut prompt = format!("Parse this Gemini CLI output:\n\n{output}");
    if !stderr.trim().is_empty() {
        prompt.push_str("\n\nStderr output:\n");
        prompt.push_str(stderr);
    }
    prompt
}
