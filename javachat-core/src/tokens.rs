//! Conservative token estimation.

/// Approximate characters per token for English prose and code.
pub const ESTIMATED_CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text`.
///
/// Uses roughly four characters per token plus one for rounding, so the
/// estimate errs high. Empty text costs zero tokens.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.chars().count() / ESTIMATED_CHARS_PER_TOKEN + 1
}
