//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. Good enough
//! for budgeting history when the provider does not report usage.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4).min(u32::MAX as usize) as u32
}

/// Share of `completion_tokens` attributable to `part` of a `whole` reply,
/// proportional to length and rounded up.
pub fn proportional_tokens(completion_tokens: u32, part: &str, whole: &str) -> u32 {
    if whole.is_empty() {
        return 0;
    }
    let share = completion_tokens as u64 * part.len() as u64;
    share.div_ceil(whole.len() as u64).min(u32::MAX as u64) as u32
}
