//! String helpers shared by the sanitizers.

/// Truncate to at most `max_chars` characters, never splitting a codepoint.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
