//! Provider Module
//!
//! Provider identities, tiers and the trait every provider client implements.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::error::Result;
use crate::router::TokenUsage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Google Gemini
    Gemini,
    /// Anthropic Claude
    Claude,
    /// Hosted Llama
    Llama,
}

/// Capability tier of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Picked for prompts that need advanced reasoning
    HighCapability,
    /// Default provider for everything else
    LowCost,
    /// Selectable by preference but without a client yet
    Reserved,
}

impl ProviderId {
    /// Every provider, in declaration order
    pub const ALL: [ProviderId; 4] = [
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::Claude,
        ProviderId::Llama,
    ];

    /// Provider used for advanced-reasoning prompts
    pub const HIGH_CAPABILITY: ProviderId = ProviderId::OpenAi;

    /// Provider used by default
    pub const LOW_COST: ProviderId = ProviderId::Gemini;

    /// Stable lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::Claude => "claude",
            ProviderId::Llama => "llama",
        }
    }

    /// Capability tier
    pub fn tier(&self) -> Tier {
        match self {
            ProviderId::OpenAi => Tier::HighCapability,
            ProviderId::Gemini => Tier::LowCost,
            ProviderId::Claude | ProviderId::Llama => Tier::Reserved,
        }
    }

    /// The one provider to try when this one fails.
    ///
    /// High-capability and low-cost fall back to each other; reserved
    /// providers fall back to the low-cost provider.
    pub fn designated_fallback(&self) -> ProviderId {
        match self.tier() {
            Tier::HighCapability => Self::LOW_COST,
            Tier::LowCost => Self::HIGH_CAPABILITY,
            Tier::Reserved => Self::LOW_COST,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a provider name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider '{0}', expected one of: openai, gemini, claude, llama")]
pub struct ParseProviderError(String);

impl FromStr for ProviderId {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| ParseProviderError(s.to_string()))
    }
}

/// What a provider is asked to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// System instructions
    pub system_prompt: String,

    /// User prompt, with any context already prefixed
    pub prompt: String,
}

/// Text produced by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Answer text
    pub text: String,

    /// Authoritative usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

/// A text-generation backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Which provider this client talks to
    fn id(&self) -> ProviderId;

    /// Generate an answer using `api_key`
    async fn generate(&self, request: &GenerateRequest, api_key: &str) -> Result<Generation>;
}
