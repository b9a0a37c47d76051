//! Usage Logging
//!
//! One `UsageLogEntry` per routed call, written best-effort to a `UsageLogger`.

pub mod rest;

pub use rest::RestUsageLogger;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Telemetry row for a single routed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    /// User the call was made for
    pub user_id: Option<String>,

    /// Provider of the last attempt
    pub model_used: String,

    /// Prompt tokens (reported or estimated)
    pub prompt_tokens: u32,

    /// Completion tokens (reported or estimated)
    pub completion_tokens: u32,

    /// Wall-clock latency of the whole call
    pub latency_ms: u64,

    /// Whether the last attempt produced an accepted answer
    pub success: bool,

    /// Why the last attempt failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// RFC 3339 UTC timestamp
    pub timestamp: String,
}

/// Current time in the format used for `timestamp`
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Destination for usage log entries
#[async_trait]
pub trait UsageLogger: Send + Sync {
    /// Persist one entry
    async fn log(&self, entry: &UsageLogEntry) -> anyhow::Result<()>;
}

/// Emits each entry as a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUsageLogger;

#[async_trait]
impl UsageLogger for TracingUsageLogger {
    async fn log(&self, entry: &UsageLogEntry) -> anyhow::Result<()> {
        tracing::info!(
            target: "mesh_router::usage",
            user_id = entry.user_id.as_deref().unwrap_or("-"),
            model_used = %entry.model_used,
            prompt_tokens = entry.prompt_tokens,
            completion_tokens = entry.completion_tokens,
            latency_ms = entry.latency_ms,
            success = entry.success,
            error = entry.error_message.as_deref().unwrap_or(""),
            "model usage"
        );
        Ok(())
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryUsageLogger {
    entries: Mutex<Vec<UsageLogEntry>>,
}

impl MemoryUsageLogger {
    /// Create an empty logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries
    pub fn entries(&self) -> Vec<UsageLogEntry> {
        self.entries.lock().clone()
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl UsageLogger for MemoryUsageLogger {
    async fn log(&self, entry: &UsageLogEntry) -> anyhow::Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}
