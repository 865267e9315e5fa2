//! Fragment tidy-up: deterministic cleanup of writer-stage Markdown.
//!
//! Writers sometimes wrap the article in a ```` ```markdown ```` fence, leave
//! CRLF line endings or pad the end with blank lines. These passes only touch
//! layout; links, images, headings and the prose itself come through as the
//! writer produced them. Fragments come out trimmed at both ends, which keeps
//! the merge separator between fragments at exactly one blank line.
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the raw output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup pass to one writer output.
///
/// 1. Strip an outer Markdown fence
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of blank lines to a single blank line
/// 5. Trim leading and trailing blank space
///
/// Whitespace-only input comes out empty.
pub fn tidy_fragment(input: &str) -> String {
    let s = strip_markdown_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Fences ───────────────────────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_markdown_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Whitespace ───────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}
