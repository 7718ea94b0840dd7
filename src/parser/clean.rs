//! Removal of Gemini CLI banner and setup lines.

/// Substrings identifying lines the CLI prints around the actual answer.
pub const NOISE_MARKERS: &[&str] = &[
    "Both GOOGLE_API_KEY and GEMINI_API_KEY are set",
    "Using GOOGLE_API_KEY",
    "Using GEMINI_API_KEY",
    "Today's date is",
    "My operating system is:",
    "I'm currently working in the directory:",
    "Showing up to",
    "This is the Gemini CLI",
    "We are setting up the context",
];

/// Drop every line containing a noise marker and trim the result.
#[must_use]
pub fn clean_output(raw: &str) -> String {
    raw.trim()
        .split('\n')
        .filter(|line| !NOISE_MARKERS.iter().any(|marker| line.contains(marker)))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
