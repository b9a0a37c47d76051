//! Response Quality Checks
//!
//! Flags answers that are too short or that hedge instead of answering.

use std::fmt;

/// Answers with fewer words than this are considered low quality
pub const MIN_WORDS: usize = 30;

/// Lowercase hedging phrases that mark an answer as low quality
const HEDGING_PHRASES: &[&str] = &[
    "i'm not sure",
    "i am not sure",
    "i don't know",
    "i do not know",
    "i'm not certain",
    "i cannot help",
    "i can't help",
    "i'm unable to",
    "i am unable to",
    "as an ai",
];

/// Reason an answer failed the quality check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityIssue {
    /// Fewer than `MIN_WORDS` words
    TooShort { words: usize },

    /// Contains a hedging phrase
    Hedging { phrase: &'static str },
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::TooShort { words } => {
                write!(f, "only {} words (minimum {})", words, MIN_WORDS)
            }
            QualityIssue::Hedging { phrase } => write!(f, "hedging phrase \"{}\"", phrase),
        }
    }
}

/// Check an answer, returning the first problem found
pub fn assess_quality(text: &str) -> Option<QualityIssue> {
    let words = text.split_whitespace().count();
    if words < MIN_WORDS {
        return Some(QualityIssue::TooShort { words });
    }

    let normalized = text.to_lowercase().replace('\u{2019}', "'");
    HEDGING_PHRASES
        .iter()
        .find(|phrase| normalized.contains(*phrase))
        .map(|phrase| QualityIssue::Hedging { phrase: *phrase })
}

/// True if the answer is too short or hedges
pub fn is_low_quality(text: &str) -> bool {
    assess_quality(text).is_some()
}
