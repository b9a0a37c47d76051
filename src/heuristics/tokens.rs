//! Token Estimation
//!
//! Fixed four-characters-per-token heuristic for providers that do not
//! report usage.

/// Characters per estimated token
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` as `ceil(chars / 4)`
pub fn estimate_tokens(text: &str) -> u32 {
    let tokens = text.chars().count().div_ceil(CHARS_PER_TOKEN);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        // 4 chars, 8 bytes
        assert_eq!(estimate_tokens("ééé!"), 1);
    }
}
