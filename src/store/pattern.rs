//! Glob pattern matching
//!
//! Shared by `KEYS` enumeration and pub/sub subscriptions. Supports `*`
//! (any run of characters, including empty) and `?` (exactly one
//! character). Everything else matches literally.

/// Returns true when `text` matches the glob `pattern`
pub fn matches(pattern: &str, text: &str) -> bool {
    matches_inner(pattern.as_bytes(), text.as_bytes())
}

fn matches_inner(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => {
            // Try every possible span for the star, shortest first
            (0..=text.len()).any(|skip| matches_inner(rest, &text[skip..]))
        }
        Some((b'?', rest)) => match text.split_first() {
            Some((_, text_rest)) => matches_inner(rest, text_rest),
            None => false,
        },
        Some((ch, rest)) => match text.split_first() {
            Some((first, text_rest)) if first == ch => matches_inner(rest, text_rest),
            _ => false,
        },
    }
}
