//! Prompt Classification
//!
//! Decides whether a prompt should go to the high-capability provider.

use regex::Regex;
use std::sync::LazyLock;

// Compiled once; any match sends the prompt to the high-capability tier.
static ADVANCED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // code and programming
        r"(?i)\b(code|coding|program(ming)?|function|algorithm|debug(ging)?|compile[rd]?|syntax|refactor|regex|sql|api)\b",
        r"(?i)\b(rust|python|javascript|typescript|java|golang)\b",
        // complexity and analysis language
        r"(?i)\b(complex|complicated|analy[sz]e|analysis|in[- ]depth|comprehensive|in detail|detailed)\b",
        // mathematics
        r"(?i)\b(math(ematics|ematical)?|equation|calculate|calculus|algebra|integral|derivative|theorem|proof|probability|statistics)\b",
        // logic and philosophy
        r"(?i)\b(logic(al)?|reasoning|philosoph(y|ical)|paradox|syllogism|deduce|deduction|infer(ence)?)\b",
        // step-by-step and implementation requests
        r"(?i)\bstep[- ]by[- ]step\b",
        r"(?i)\b(implement(ation)?|architect(ure)?|design (a|an|the))\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// True when the prompt asks for code, math, logic, analysis or step-by-step work
pub fn needs_advanced_reasoning(prompt: &str) -> bool {
    ADVANCED_PATTERNS.iter().any(|re| re.is_match(prompt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_and_math_prompts() {
        assert!(needs_advanced_reasoning("Write a Python function that reverses a list"));
        assert!(needs_advanced_reasoning("Can you DEBUG this?"));
        assert!(needs_advanced_reasoning("Solve this equation for x"));
        assert!(needs_advanced_reasoning("what is the derivative of x^2"));
    }

    #[test]
    fn test_reasoning_prompts() {
        assert!(needs_advanced_reasoning(
            "Explain in detail how quicksort's partition step works"
        ));
        assert!(needs_advanced_reasoning("Walk me through it step by step"));
        assert!(needs_advanced_reasoning("Is this a logical fallacy?"));
        assert!(needs_advanced_reasoning("How would you implement a cache?"));
    }

    #[test]
    fn test_casual_prompts() {
        assert!(!needs_advanced_reasoning("hi"));
        assert!(!needs_advanced_reasoning("What did I talk about with Sam last week?"));
        assert!(!needs_advanced_reasoning("Summarize my notes on gardening"));
    }

    #[test]
    fn test_whole_words_only() {
        // "apiary" and "encoded" must not trip the code patterns
        assert!(!needs_advanced_reasoning("notes about the apiary"));
        assert!(!needs_advanced_reasoning("the message was encoded"));
    }

    #[test]
    fn test_classification_is_stable() {
        let prompt = "Explain the proof of Fermat's little theorem";
        let first = needs_advanced_reasoning(prompt);
        for _ in 0..5 {
            assert_eq!(needs_advanced_reasoning(prompt), first);
        }
    }
}
