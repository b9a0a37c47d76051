//! REST credential store
//!
//! Reads `api_keys` from a PostgREST-style user settings table.

use super::{CredentialStore, ProviderCredentials};
use crate::client::{Auth, HttpClient};
use crate::config::DataStoreConfig;
use crate::provider::ProviderId;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct SettingsRow {
    #[serde(default)]
    api_keys: Option<HashMap<String, Option<String>>>,
}

/// Credential store backed by the user settings table
pub struct RestCredentialStore {
    http: HttpClient,
    table_url: String,
    service_key: String,
    headers: HeaderMap,
}

impl RestCredentialStore {
    /// Create a store for the configured settings table
    pub fn new(
        http: HttpClient,
        config: &DataStoreConfig,
        service_key: String,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&service_key).context("invalid data store key")?,
        );

        Ok(Self {
            http,
            table_url: config.table_url(&config.settings_table),
            service_key,
            headers,
        })
    }
}

#[async_trait]
impl CredentialStore for RestCredentialStore {
    async fn user_api_keys(&self, user_id: &str) -> anyhow::Result<ProviderCredentials> {
        let mut url = Url::parse(&self.table_url).context("invalid settings table url")?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{}", user_id))
            .append_pair("select", "api_keys");

        let rows: Vec<SettingsRow> = self
            .http
            .get_json(
                url.as_str(),
                Auth::Bearer(&self.service_key),
                Some(&self.headers),
                "user-settings",
            )
            .await?;

        let mut keys = ProviderCredentials::new();
        let saved = rows.into_iter().next().and_then(|row| row.api_keys);

        for (name, key) in saved.into_iter().flatten() {
            let Some(key) = key.filter(|k| !k.is_empty()) else {
                continue;
            };
            match name.parse::<ProviderId>() {
                Ok(provider) => {
                    keys.insert(provider, key);
                }
                Err(e) => tracing::debug!(error = %e, "ignoring saved key"),
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn store(url: String) -> RestCredentialStore {
        let config = DataStoreConfig {
            url,
            api_key_env: "UNUSED".to_string(),
            usage_table: "model_usage_logs".to_string(),
            settings_table: "user_settings".to_string(),
        };
        RestCredentialStore::new(HttpClient::new(0).unwrap(), &config, "svc".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_reads_known_providers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/user_settings")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_id".into(), "eq.u-42".into()),
                Matcher::UrlEncoded("select".into(), "api_keys".into()),
            ]))
            .match_header("apikey", "svc")
            .match_header("authorization", "Bearer svc")
            .with_status(200)
            .with_body(
                r#"[{"api_keys": {"openai": "sk-user", "gemini": "", "mistral": "m-key", "claude": null}}]"#,
            )
            .create_async()
            .await;

        let keys = store(server.url()).user_api_keys("u-42").await.unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys.get(&ProviderId::OpenAi).map(String::as_str), Some("sk-user"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_row_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/user_settings")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let keys = store(server.url()).user_api_keys("nobody").await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_err() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/user_settings")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        assert!(store(server.url()).user_api_keys("u-1").await.is_err());
    }
}
