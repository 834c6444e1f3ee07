//! Field helpers for log events

/// Shorten `text` to at most `max_chars` characters, marking the cut with "...".
///
/// Cuts on a character boundary, never inside a multi-byte sequence.
///
/// # Examples
///
/// ```
/// use gatekeeper::logging::truncate_text;
///
/// assert_eq!(truncate_text("hello world", 5), "hello...");
/// assert_eq!(truncate_text("short", 10), "short");
/// ```
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
