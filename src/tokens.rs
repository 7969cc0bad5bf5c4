//! Rough token accounting.
//!
//! Model tokenizers are opaque to Aurora, so budgets are enforced against an
//! estimate of four characters per token, which is close for English text.

const CHARS_PER_TOKEN: usize = 4;

/// Estimate the number of tokens `text` will occupy.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Cut `text` so its estimate fits within `max_tokens`, on a char boundary.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
