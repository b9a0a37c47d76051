//! Credentials Module
//!
//! Per-user API keys and the process-wide default keys they fall back to.

pub mod rest;

pub use rest::RestCredentialStore;

use crate::config::RouterConfig;
use crate::provider::ProviderId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// API keys a user has saved, keyed by provider
pub type ProviderCredentials = HashMap<ProviderId, String>;

/// Source of per-user API keys
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Keys saved by `user_id`. An unknown user yields an empty map
    async fn user_api_keys(&self, user_id: &str) -> anyhow::Result<ProviderCredentials>;
}

/// Store with no per-user keys; every lookup resolves to the defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

#[async_trait]
impl CredentialStore for NoCredentials {
    async fn user_api_keys(&self, _user_id: &str) -> anyhow::Result<ProviderCredentials> {
        Ok(ProviderCredentials::new())
    }
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    users: RwLock<HashMap<String, ProviderCredentials>>,
}

impl StaticCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a key for a user, replacing any previous one
    pub fn set_user_key(&self, user_id: &str, provider: ProviderId, key: impl Into<String>) {
        self.users
            .write()
            .entry(user_id.to_string())
            .or_default()
            .insert(provider, key.into());
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn user_api_keys(&self, user_id: &str) -> anyhow::Result<ProviderCredentials> {
        Ok(self.users.read().get(user_id).cloned().unwrap_or_default())
    }
}

/// Process-wide default keys, read once at startup
#[derive(Debug, Default, Clone)]
pub struct DefaultKeys {
    keys: HashMap<ProviderId, String>,
}

impl DefaultKeys {
    /// Create an empty key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Read each provider's `api_key_env` variable
    pub fn from_config(config: &RouterConfig) -> Self {
        let keys = config
            .providers
            .iter()
            .filter_map(|(id, provider)| provider.default_api_key().map(|key| (*id, key)))
            .collect();
        Self { keys }
    }

    /// Add or replace a default key
    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    /// Default key for a provider
    pub fn get(&self, provider: ProviderId) -> Option<&str> {
        self.keys
            .get(&provider)
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_store_lookup() {
        let store = StaticCredentialStore::new();
        store.set_user_key("u-1", ProviderId::OpenAi, "sk-old");
        store.set_user_key("u-1", ProviderId::OpenAi, "sk-new");

        let keys = store.user_api_keys("u-1").await.unwrap();
        assert_eq!(keys.get(&ProviderId::OpenAi).map(String::as_str), Some("sk-new"));
        assert!(store.user_api_keys("someone-else").await.unwrap().is_empty());
    }

    #[test]
    fn test_default_keys_skip_empty() {
        let keys = DefaultKeys::new()
            .with_key(ProviderId::Gemini, "g-key")
            .with_key(ProviderId::OpenAi, "");

        assert_eq!(keys.get(ProviderId::Gemini), Some("g-key"));
        assert_eq!(keys.get(ProviderId::OpenAi), None);
        assert_eq!(keys.get(ProviderId::Claude), None);
    }
}
