//! REST usage logger
//!
//! Inserts usage rows into a PostgREST-style table.

use super::{UsageLogEntry, UsageLogger};
use crate::client::{Auth, HttpClient};
use crate::config::DataStoreConfig;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

/// Usage logger backed by the usage table
pub struct RestUsageLogger {
    http: HttpClient,
    table_url: String,
    service_key: String,
    headers: HeaderMap,
}

impl RestUsageLogger {
    /// Create a logger for the configured usage table
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
        headers.insert("prefer", HeaderValue::from_static("return=minimal"));

        Ok(Self {
            http,
            table_url: config.table_url(&config.usage_table),
            service_key,
            headers,
        })
    }
}

#[async_trait]
impl UsageLogger for RestUsageLogger {
    async fn log(&self, entry: &UsageLogEntry) -> anyhow::Result<()> {
        self.http
            .post_discard(
                &self.table_url,
                entry,
                Auth::Bearer(&self.service_key),
                Some(&self.headers),
                "usage-log",
            )
            .await
            .context("failed to insert usage row")
    }
}
