//! Mesh Router Error Types
//!
//! `MeshError` covers configuration, transport and provider failures.
//! `RoutingError` classifies why a single routing attempt failed; the router
//! never returns it from `route`, only from `try_route`.

use crate::heuristics::QualityIssue;
use crate::provider::ProviderId;
use thiserror::Error;

/// Main error type for configuration and provider I/O
#[derive(Debug, Error)]
pub enum MeshError {
    /// Configuration errors (invalid JSON, unreadable file, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider has no client registered in the provider table
    #[error("Provider '{0}' is not available. It has no client configured in this router")]
    ProviderNotFound(String),

    /// Rate limit exceeded after transport retries
    #[error("Rate limited by '{provider}'")]
    RateLimited { provider: String },

    /// HTTP request failed
    #[error("Request failed: {0}")]
    Request(String),

    /// Response parsing failed or the response carried no text
    #[error("Response error: {0}")]
    Response(String),

    /// Authentication failed
    #[error("Authentication failed: {0}. Check your API key.")]
    Auth(String),

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for MeshError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MeshError::Timeout(err.to_string())
        } else if err.is_connect() {
            MeshError::Request(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            MeshError::Response(format!("Failed to decode response: {}", err))
        } else {
            MeshError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(err: serde_json::Error) -> Self {
        MeshError::Response(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for MeshError {
    fn from(err: std::io::Error) -> Self {
        MeshError::Config(format!("IO error: {}", err))
    }
}

/// Why a routing attempt did not produce an accepted answer
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Neither a per-user nor a default key exists for the provider
    #[error("no API key available for '{provider}'")]
    MissingCredentials { provider: ProviderId },

    /// Network, HTTP or SDK-level failure calling the provider
    #[error("provider '{provider}' failed: {source}")]
    Provider {
        provider: ProviderId,
        #[source]
        source: MeshError,
    },

    /// The call succeeded but the answer failed the quality gate
    #[error("response from '{provider}' rejected: {issue}")]
    QualityRejected {
        provider: ProviderId,
        issue: QualityIssue,
    },

    /// Usage-log write failed
    #[error("usage log write failed: {0}")]
    Logging(String),
}

impl RoutingError {
    /// Provider the failed attempt was made against, if any
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            RoutingError::MissingCredentials { provider }
            | RoutingError::Provider { provider, .. }
            | RoutingError::QualityRejected { provider, .. } => Some(*provider),
            RoutingError::Logging(_) => None,
        }
    }
}

/// Result type alias for mesh router operations
pub type Result<T> = std::result::Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_messages() {
        let err = RoutingError::MissingCredentials {
            provider: ProviderId::OpenAi,
        };
        assert_eq!(err.to_string(), "no API key available for 'openai'");

        let err = RoutingError::Provider {
            provider: ProviderId::Gemini,
            source: MeshError::Timeout("60s elapsed".to_string()),
        };
        assert!(err.to_string().contains("gemini"));
        assert!(err.to_string().contains("60s elapsed"));
    }

    #[test]
    fn test_routing_error_provider() {
        let err = RoutingError::QualityRejected {
            provider: ProviderId::Gemini,
            issue: QualityIssue::TooShort { words: 3 },
        };
        assert_eq!(err.provider(), Some(ProviderId::Gemini));
        assert_eq!(RoutingError::Logging("down".to_string()).provider(), None);
    }
}
