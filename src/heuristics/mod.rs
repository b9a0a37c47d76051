//! Heuristics Module
//!
//! Pure text heuristics the router decides with: token estimation, prompt
//! classification and response quality checks.

pub mod classifier;
pub mod quality;
pub mod tokens;

pub use classifier::needs_advanced_reasoning;
pub use quality::{assess_quality, is_low_quality, QualityIssue, MIN_WORDS};
pub use tokens::estimate_tokens;
