//! Small string helpers shared by notifications and reports

/// Cut `s` to at most `max_len` bytes, ending in "..." when anything was
/// dropped. Never splits a multi-byte character.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let suffix = "...";
    let mut end = max_len.saturating_sub(suffix.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], suffix)
}

/// Leading lines of `text`, capped at `max_lines`
pub fn head_lines(text: &str, max_lines: usize) -> String {
    text.lines().take(max_lines).collect::<Vec<_>>().join("\n")
}
