//! Routing request and result types

use crate::heuristics::estimate_tokens;
use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};

/// Suffix appended to `model_used` when the fallback provider answered
pub const FALLBACK_SUFFIX: &str = " (fallback)";

/// `model_used` sentinel for total failure
pub const ERROR_FALLBACK_MODEL: &str = "error-fallback";

/// Answer returned when both attempts fail
pub const GRACEFUL_FAILURE_MESSAGE: &str = "I'm sorry, but I'm having trouble generating a response right now. \
     Please try again in a moment.";

/// Token counts for one call. `total` is always `prompt + completion`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTokenUsage")]
pub struct TokenUsage {
    prompt: u32,
    completion: u32,
    total: u32,
}

/// Wire form of [`TokenUsage`]; `total` is checked, or computed when absent
#[derive(Deserialize)]
struct RawTokenUsage {
    prompt: u32,
    completion: u32,
    #[serde(default)]
    total: Option<u32>,
}

impl TryFrom<RawTokenUsage> for TokenUsage {
    type Error = String;

    fn try_from(raw: RawTokenUsage) -> std::result::Result<Self, Self::Error> {
        let sum = raw
            .prompt
            .checked_add(raw.completion)
            .ok_or_else(|| "token counts overflow u32".to_string())?;
        match raw.total {
            Some(total) if total != sum => Err(format!(
                "total {} does not equal prompt {} + completion {}",
                total, raw.prompt, raw.completion
            )),
            _ => Ok(Self::new(raw.prompt, raw.completion)),
        }
    }
}

impl TokenUsage {
    /// Usage from prompt and completion counts. The completion count is
    /// clamped so the total fits in a `u32`
    pub fn new(prompt: u32, completion: u32) -> Self {
        let completion = completion.min(u32::MAX - prompt);
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }

    /// Usage estimated from the texts exchanged
    pub fn estimated(prompt_tokens: u32, completion_text: &str) -> Self {
        Self::new(prompt_tokens, estimate_tokens(completion_text))
    }

    pub fn prompt(&self) -> u32 {
        self.prompt
    }

    pub fn completion(&self) -> u32 {
        self.completion
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

/// A prompt to route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRequest {
    /// User prompt
    pub prompt: String,

    /// Provider requested by the caller; skips classification
    #[serde(default)]
    pub model_preference: Option<ProviderId>,

    /// System prompt; the router's default is used when unset
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Retrieved context prefixed to the prompt
    #[serde(default)]
    pub context: Option<String>,

    /// User whose saved keys are tried first
    #[serde(default)]
    pub user_id: Option<String>,
}

impl RoutingRequest {
    /// Request with only a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model_preference: None,
            system_prompt: None,
            context: None,
            user_id: None,
        }
    }

    /// Ask for a specific provider
    pub fn with_preference(mut self, provider: ProviderId) -> Self {
        self.model_preference = Some(provider);
        self
    }

    /// Override the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Attach retrieved context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Route on behalf of a user
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// The prompt text sent to providers, with any context prefixed
    pub fn composed_prompt(&self) -> String {
        match self.context.as_deref() {
            Some(context) if !context.trim().is_empty() => {
                format!("Context:\n{}\n\nQuestion: {}", context, self.prompt)
            }
            _ => self.prompt.clone(),
        }
    }
}

/// Outcome of a routed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingResult {
    /// Answer text, or the apology on total failure
    pub response_text: String,

    /// Provider that answered, `"<id> (fallback)"`, or `"error-fallback"`
    pub model_used: String,

    /// Reported or estimated token usage
    pub token_usage: TokenUsage,

    /// Wall-clock latency of the call
    pub latency_ms: u64,
}

impl RoutingResult {
    /// True when neither provider produced an answer
    pub fn is_error_fallback(&self) -> bool {
        self.model_used == ERROR_FALLBACK_MODEL
    }

    /// True when the answer came from the fallback provider
    pub fn is_fallback(&self) -> bool {
        self.model_used.ends_with(FALLBACK_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(12, 30);
        assert_eq!(usage.total(), 42);
        assert_eq!(usage.total(), usage.prompt() + usage.completion());

        let estimated = TokenUsage::estimated(3, "abcdefgh");
        assert_eq!(estimated.completion(), 2);
        assert_eq!(estimated.total(), 5);
    }

    #[test]
    fn test_token_usage_total_never_overflows() {
        let usage = TokenUsage::new(u32::MAX, 5);
        assert_eq!(usage.total(), u32::MAX);
        assert_eq!(usage.completion(), 0);

        let usage = TokenUsage::new(u32::MAX - 2, 5);
        assert_eq!(usage.completion(), 2);
        assert_eq!(usage.total(), usage.prompt() + usage.completion());
    }

    #[test]
    fn test_token_usage_deserialize_checks_total() {
        let usage: TokenUsage =
            serde_json::from_str(r#"{"prompt": 1, "completion": 2, "total": 3}"#).unwrap();
        assert_eq!(usage, TokenUsage::new(1, 2));

        let usage: TokenUsage = serde_json::from_str(r#"{"prompt": 4, "completion": 6}"#).unwrap();
        assert_eq!(usage.total(), 10);

        assert!(
            serde_json::from_str::<TokenUsage>(r#"{"prompt": 1, "completion": 2, "total": 99}"#)
                .is_err()
        );
        assert!(serde_json::from_str::<TokenUsage>(
            r#"{"prompt": 4294967295, "completion": 1, "total": 0}"#
        )
        .is_err());
    }

    #[test]
    fn test_result_deserialize_rejects_inconsistent_usage() {
        let body = r#"{
            "response_text": "hi",
            "model_used": "gemini",
            "token_usage": {"prompt": 5, "completion": 5, "total": 0},
            "latency_ms": 3
        }"#;
        assert!(serde_json::from_str::<RoutingResult>(body).is_err());

        let body = body.replace(r#""total": 0"#, r#""total": 10"#);
        let result: RoutingResult = serde_json::from_str(&body).unwrap();
        assert_eq!(result.token_usage.total(), 10);
    }

    #[test]
    fn test_composed_prompt() {
        let plain = RoutingRequest::new("what did I say?");
        assert_eq!(plain.composed_prompt(), "what did I say?");

        let with_context = RoutingRequest::new("what did I say?").with_context("I said hello");
        assert_eq!(
            with_context.composed_prompt(),
            "Context:\nI said hello\n\nQuestion: what did I say?"
        );

        let blank_context = RoutingRequest::new("q").with_context("  ");
        assert_eq!(blank_context.composed_prompt(), "q");
    }

    #[test]
    fn test_request_deserializes_preference() {
        let request: RoutingRequest =
            serde_json::from_str(r#"{"prompt": "hi", "model_preference": "claude"}"#).unwrap();
        assert_eq!(request.model_preference, Some(ProviderId::Claude));
        assert_eq!(request.user_id, None);
    }

    #[test]
    fn test_result_markers() {
        let result = RoutingResult {
            response_text: GRACEFUL_FAILURE_MESSAGE.to_string(),
            model_used: ERROR_FALLBACK_MODEL.to_string(),
            token_usage: TokenUsage::default(),
            latency_ms: 0,
        };
        assert!(result.is_error_fallback());
        assert!(!result.is_fallback());
    }
}
