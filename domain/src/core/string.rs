//! String utilities for the domain layer.

/// Truncate a string to at most `max_chars` characters, appending `...` when
/// anything was cut.
///
/// Counts Unicode scalar values rather than bytes, so multi-byte text is
/// never split inside a character.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((end, _)) => format!("{}...", &s[..end]),
    }
}

/// Returns `true` if the string holds nothing but whitespace.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
