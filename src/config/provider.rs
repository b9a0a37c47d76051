//! Router Configuration
//!
//! Defines the configuration schema for providers, routing and the data store.

use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Provider configurations keyed by provider id
    pub providers: HashMap<ProviderId, ProviderConfig>,

    /// Routing behaviour
    #[serde(default)]
    pub routing: RoutingSettings,

    /// Optional REST data store for per-user keys and usage logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_store: Option<DataStoreConfig>,
}

/// Configuration for a single LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for the API
    pub base_url: String,

    /// Model name sent to the provider
    pub model: String,

    /// Environment variable holding the process-wide default key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Optional environment variable for custom base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_env: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Cap on generated tokens; the provider's own limit applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Additional headers to send with requests
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

fn default_temperature() -> f32 {
    0.7
}

/// Routing behaviour shared by all providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// System prompt used when a request does not supply one
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,

    /// Upper bound on a single provider attempt, in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Transport retries for connection errors, timeouts and 429s
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_system_prompt() -> String {
    "You are the MeshMemory assistant. Answer the user's question clearly, \
     using the provided context from their saved conversations and documents when it is relevant."
        .to_string()
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    1
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            default_system_prompt: default_system_prompt(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl RoutingSettings {
    /// Attempt timeout as a `Duration`
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// PostgREST-style data store holding user settings and usage logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataStoreConfig {
    /// Base URL of the project (the `/rest/v1` prefix is appended)
    pub url: String,

    /// Environment variable holding the service key
    pub api_key_env: String,

    /// Table receiving usage log rows
    #[serde(default = "default_usage_table")]
    pub usage_table: String,

    /// Table holding per-user API keys
    #[serde(default = "default_settings_table")]
    pub settings_table: String,
}

fn default_usage_table() -> String {
    "model_usage_logs".to_string()
}

fn default_settings_table() -> String {
    "user_settings".to_string()
}

impl DataStoreConfig {
    /// Service key from the environment
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }

    /// REST endpoint for a table
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }
}

impl ProviderConfig {
    /// Get the effective base URL (from env var if configured, otherwise default)
    pub fn get_base_url(&self) -> String {
        if let Some(env_var) = &self.api_base_env {
            if let Ok(url) = std::env::var(env_var) {
                return url;
            }
        }
        self.base_url.clone()
    }

    /// Process-wide default API key, if set and non-empty
    pub fn default_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|env_var| std::env::var(env_var).ok())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_router_config() {
        let json = r#"{
            "providers": {
                "openai": {
                    "base_url": "https://api.openai.com/v1",
                    "model": "gpt-4o",
                    "api_key_env": "OPENAI_API_KEY"
                },
                "gemini": {
                    "base_url": "https://generativelanguage.googleapis.com/v1beta",
                    "model": "gemini-1.5-flash",
                    "temperature": 0.2
                }
            },
            "routing": {"attempt_timeout_secs": 15}
        }"#;

        let config: RouterConfig = serde_json::from_str(json).unwrap();
        let openai = &config.providers[&ProviderId::OpenAi];
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(openai.temperature, 0.7);
        assert_eq!(config.providers[&ProviderId::Gemini].temperature, 0.2);
        assert_eq!(config.routing.attempt_timeout(), Duration::from_secs(15));
        assert_eq!(config.routing.max_retries, 1);
        assert!(config.routing.default_system_prompt.contains("MeshMemory"));
        assert!(config.data_store.is_none());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let json = r#"{"providers": {"cohere": {"base_url": "x", "model": "y"}}}"#;
        assert!(serde_json::from_str::<RouterConfig>(json).is_err());
    }

    #[test]
    fn test_default_api_key_ignores_empty() {
        let config = ProviderConfig {
            base_url: "https://api.example.com".to_string(),
            model: "m".to_string(),
            api_key_env: Some("MESH_ROUTER_TEST_EMPTY_KEY".to_string()),
            api_base_env: None,
            temperature: 0.7,
            max_tokens: None,
            headers: HashMap::new(),
        };

        std::env::set_var("MESH_ROUTER_TEST_EMPTY_KEY", "");
        assert_eq!(config.default_api_key(), None);

        std::env::set_var("MESH_ROUTER_TEST_EMPTY_KEY", "sk-123");
        assert_eq!(config.default_api_key(), Some("sk-123".to_string()));
        std::env::remove_var("MESH_ROUTER_TEST_EMPTY_KEY");
    }

    #[test]
    fn test_data_store_table_url() {
        let store: DataStoreConfig = serde_json::from_str(
            r#"{"url": "https://project.example.co/", "api_key_env": "DATA_STORE_KEY"}"#,
        )
        .unwrap();

        assert_eq!(
            store.table_url(&store.usage_table),
            "https://project.example.co/rest/v1/model_usage_logs"
        );
        assert_eq!(store.settings_table, "user_settings");
    }
}
