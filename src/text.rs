//! Character-safe text helpers shared by extraction and projection.

/// Return at most `max_chars` Unicode scalar values from the start of `text`.
///
/// Never splits a multi-byte character.
pub fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Trim surrounding whitespace, then cap to `max_chars`.
pub fn trim_and_cap(text: &str, max_chars: usize) -> String {
    cap_chars(text.trim(), max_chars).trim_end().to_owned()
}

/// Number of Unicode scalar values in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
