//! Provider Table
//!
//! Maps every provider id to its client (if any) and its one fallback.

use crate::client::HttpClient;
use crate::config::RouterConfig;
use crate::provider::{ChatProvider, GeminiProvider, OpenAiProvider, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;

/// Table row for one provider
#[derive(Clone)]
pub struct ProviderEntry {
    /// Client used to invoke the provider; `None` until one is registered
    pub client: Option<Arc<dyn ChatProvider>>,

    /// Provider tried once when this one fails
    pub fallback: ProviderId,
}

/// Provider id -> {client, fallback}
#[derive(Clone)]
pub struct ProviderTable {
    entries: HashMap<ProviderId, ProviderEntry>,
}

impl ProviderTable {
    /// Table with a row for every provider and no clients
    pub fn new() -> Self {
        let entries = ProviderId::ALL
            .into_iter()
            .map(|id| {
                (
                    id,
                    ProviderEntry {
                        client: None,
                        fallback: id.designated_fallback(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Table with the built-in clients for every configured provider
    pub fn from_config(config: &RouterConfig, http: &HttpClient) -> Self {
        let mut table = Self::new();

        for (id, provider) in &config.providers {
            let client: Arc<dyn ChatProvider> = match id {
                ProviderId::OpenAi => Arc::new(OpenAiProvider::new(http.clone(), provider)),
                ProviderId::Gemini => Arc::new(GeminiProvider::new(http.clone(), provider)),
                ProviderId::Claude | ProviderId::Llama => continue,
            };
            table = table.register(client);
        }

        table
    }

    /// Register a client under its own id, replacing any existing one
    pub fn register(mut self, client: Arc<dyn ChatProvider>) -> Self {
        let id = client.id();
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.client = Some(client);
        }
        self
    }

    /// Client for a provider
    pub fn client(&self, id: ProviderId) -> Option<&Arc<dyn ChatProvider>> {
        self.entries.get(&id).and_then(|e| e.client.as_ref())
    }

    /// Designated fallback for a provider
    pub fn fallback_of(&self, id: ProviderId) -> ProviderId {
        self.entries
            .get(&id)
            .map(|e| e.fallback)
            .unwrap_or_else(|| id.designated_fallback())
    }

    /// Providers that have a client
    pub fn available(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.client(*id).is_some())
            .collect()
    }
}

impl Default for ProviderTable {
    fn default() -> Self {
        Self::new()
    }
}
