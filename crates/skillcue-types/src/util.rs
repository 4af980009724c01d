//! Small string helpers shared by the encoder and the CLI.

/// Largest byte index <= `i` that sits on a UTF-8 char boundary.
fn floor_char_boundary(s: &str, i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    let mut pos = i;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Truncate `&str` to at most `max_bytes`, never splitting a UTF-8 codepoint.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        s
    } else {
        &s[..floor_char_boundary(s, max_bytes)]
    }
}

/// Truncate to at most `max_bytes` and mark the cut with a trailing note.
///
/// The note is not counted against `max_bytes`.
pub fn truncate_with_note(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let kept = truncate_str(s, max_bytes).trim_end();
    format!("{kept}\n[... truncated, {} more bytes]", s.len() - kept.len())
}
