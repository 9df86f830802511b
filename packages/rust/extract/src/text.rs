//! Text normalization helpers shared by every extractor.

use std::sync::LazyLock;

use regex::Regex;

/// Marker appended when content is cut to fit a prompt budget.
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated for LLM context window ...]";

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text.trim(), " ").into_owned()
}

/// Cut `content` to at most `max_chars` characters, appending a marker when cut.
///
/// Counts characters, not bytes, so multi-byte text never splits mid-codepoint.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &content[..byte_idx]),
    }
}
