//! Model Router
//!
//! Picks a provider for a prompt, gates the answer on quality, falls back
//! exactly once, and writes one usage-log entry per call.
//!
//! ```text
//! SELECT_PROVIDER -> ATTEMPT_PRIMARY -> {SUCCESS, QUALITY_REJECTED, FAILED}
//! QUALITY_REJECTED, FAILED -> ATTEMPT_FALLBACK -> {SUCCESS, FAILED} -> DONE
//! ```

use super::table::ProviderTable;
use super::types::{
    RoutingRequest, RoutingResult, TokenUsage, ERROR_FALLBACK_MODEL, FALLBACK_SUFFIX,
    GRACEFUL_FAILURE_MESSAGE,
};
use crate::client::HttpClient;
use crate::config::{ConfigLoader, RouterConfig, RoutingSettings};
use crate::credentials::{
    CredentialStore, DefaultKeys, NoCredentials, ProviderCredentials, RestCredentialStore,
};
use crate::error::{MeshError, Result, RoutingError};
use crate::heuristics::{assess_quality, estimate_tokens, needs_advanced_reasoning};
use crate::provider::{GenerateRequest, Generation, ProviderId, Tier};
use crate::usage::{timestamp_now, RestUsageLogger, TracingUsageLogger, UsageLogEntry, UsageLogger};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Which attempt produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Primary,
    Fallback,
}

/// An accepted answer
#[derive(Debug)]
pub struct RouteAnswer {
    /// Provider that answered
    pub provider: ProviderId,

    /// Attempt that answered
    pub stage: Stage,

    /// Answer text
    pub text: String,

    /// Reported usage, or an estimate against the prompt sent
    pub token_usage: TokenUsage,

    /// Why the primary attempt was abandoned, for fallback answers
    pub primary_error: Option<RoutingError>,
}

impl RouteAnswer {
    /// `model_used` value for this answer
    pub fn model_used(&self) -> String {
        match self.stage {
            Stage::Primary => self.provider.to_string(),
            Stage::Fallback => format!("{}{}", self.provider, FALLBACK_SUFFIX),
        }
    }
}

/// Both attempts failed
#[derive(Debug)]
pub struct RouteFailure {
    /// Provider tried first
    pub primary: ProviderId,

    /// Why the primary attempt failed
    pub primary_error: RoutingError,

    /// Provider tried second
    pub fallback: ProviderId,

    /// Why the fallback attempt failed
    pub fallback_error: RoutingError,

    /// Estimated tokens of the prompt that was sent
    pub prompt_tokens: u32,
}

/// Routes prompts across providers with one-level fallback
pub struct ModelRouter {
    /// Provider id -> {client, fallback}
    table: ProviderTable,

    /// Process-wide keys, also the only keys used on fallback
    default_keys: DefaultKeys,

    /// Per-user keys, fetched on every call
    credentials: Arc<dyn CredentialStore>,

    /// Usage log destination
    usage: Arc<dyn UsageLogger>,

    /// System prompt for requests that do not set one
    default_system_prompt: String,

    /// Upper bound on a single provider attempt
    attempt_timeout: Duration,
}

impl ModelRouter {
    /// Create a router with no per-user keys that logs usage through `tracing`
    pub fn new(table: ProviderTable, default_keys: DefaultKeys, settings: &RoutingSettings) -> Self {
        Self {
            table,
            default_keys,
            credentials: Arc::new(NoCredentials),
            usage: Arc::new(TracingUsageLogger),
            default_system_prompt: settings.default_system_prompt.clone(),
            attempt_timeout: settings.attempt_timeout(),
        }
    }

    /// Build a router from configuration, wiring the data store when one is configured
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        let http = HttpClient::new(config.routing.max_retries)?;
        let table = ProviderTable::from_config(config, &http);
        let mut router = Self::new(table, DefaultKeys::from_config(config), &config.routing);

        if let Some(store) = &config.data_store {
            match store.api_key() {
                Some(key) => {
                    let credentials = RestCredentialStore::new(http.clone(), store, key.clone())
                        .map_err(|e| MeshError::Config(format!("{:#}", e)))?;
                    let usage = RestUsageLogger::new(http, store, key)
                        .map_err(|e| MeshError::Config(format!("{:#}", e)))?;
                    router = router
                        .with_credentials(Arc::new(credentials))
                        .with_usage_logger(Arc::new(usage));
                }
                None => warn!(
                    env = %store.api_key_env,
                    "data store configured without a key; per-user keys and usage persistence disabled"
                ),
            }
        }

        info!(providers = ?router.table.available(), "model router ready");
        Ok(router)
    }

    /// Build a router from the default configuration sources
    pub fn from_default_config() -> Result<Self> {
        let loader = ConfigLoader::new()?;
        Self::from_config(loader.config())
    }

    /// Use a credential store for per-user keys
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Send usage log entries to `usage`
    pub fn with_usage_logger(mut self, usage: Arc<dyn UsageLogger>) -> Self {
        self.usage = usage;
        self
    }

    /// Override the per-attempt timeout
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Primary provider for a request
    pub fn select_provider(&self, request: &RoutingRequest) -> ProviderId {
        if let Some(preferred) = request.model_preference {
            return preferred;
        }

        if needs_advanced_reasoning(&request.prompt) {
            ProviderId::HIGH_CAPABILITY
        } else {
            ProviderId::LOW_COST
        }
    }

    /// Route a request. Never fails: total failure yields the apology text
    /// with `model_used == "error-fallback"`.
    pub async fn route(&self, request: RoutingRequest) -> RoutingResult {
        let started = Instant::now();
        let outcome = self.try_route(&request).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (result, entry) = match outcome {
            Ok(answer) => {
                let model_used = answer.model_used();
                let entry = UsageLogEntry {
                    user_id: request.user_id.clone(),
                    model_used: model_used.clone(),
                    prompt_tokens: answer.token_usage.prompt(),
                    completion_tokens: answer.token_usage.completion(),
                    latency_ms,
                    success: true,
                    error_message: None,
                    timestamp: timestamp_now(),
                };
                let result = RoutingResult {
                    response_text: answer.text,
                    model_used,
                    token_usage: answer.token_usage,
                    latency_ms,
                };
                (result, entry)
            }
            Err(failure) => {
                error!(
                    primary = %failure.primary,
                    primary_error = %failure.primary_error,
                    fallback = %failure.fallback,
                    fallback_error = %failure.fallback_error,
                    "all providers failed"
                );
                let token_usage = TokenUsage::new(failure.prompt_tokens, 0);
                let entry = UsageLogEntry {
                    user_id: request.user_id.clone(),
                    model_used: failure.fallback.to_string(),
                    prompt_tokens: token_usage.prompt(),
                    completion_tokens: token_usage.completion(),
                    latency_ms,
                    success: false,
                    error_message: Some(failure.fallback_error.to_string()),
                    timestamp: timestamp_now(),
                };
                let result = RoutingResult {
                    response_text: GRACEFUL_FAILURE_MESSAGE.to_string(),
                    model_used: ERROR_FALLBACK_MODEL.to_string(),
                    token_usage,
                    latency_ms,
                };
                (result, entry)
            }
        };

        self.record_usage(&entry).await;
        result
    }

    /// Run the primary and, if needed, the fallback attempt without logging usage
    pub async fn try_route(
        &self,
        request: &RoutingRequest,
    ) -> std::result::Result<RouteAnswer, RouteFailure> {
        let generate = GenerateRequest {
            system_prompt: request
                .system_prompt
                .clone()
                .unwrap_or_else(|| self.default_system_prompt.clone()),
            prompt: request.composed_prompt(),
        };

        let primary = self.select_provider(request);
        debug!(
            provider = %primary,
            preferred = request.model_preference.is_some(),
            "selected primary provider"
        );

        let user_keys = self.user_keys(request.user_id.as_deref()).await;
        let user_key = user_keys.get(&primary).map(String::as_str);

        let primary_error = match self.attempt(primary, user_key, &generate).await {
            Ok(generation) => match quality_gate(primary, &generation) {
                Ok(()) => {
                    return Ok(answer(primary, Stage::Primary, generation, &generate, None));
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        let fallback = self.table.fallback_of(primary);
        warn!(provider = %primary, error = %primary_error, "primary attempt failed");
        info!(from = %primary, to = %fallback, "falling back");

        match self.attempt(fallback, None, &generate).await {
            Ok(generation) => Ok(answer(
                fallback,
                Stage::Fallback,
                generation,
                &generate,
                Some(primary_error),
            )),
            Err(fallback_error) => Err(RouteFailure {
                primary,
                primary_error,
                fallback,
                fallback_error,
                prompt_tokens: prompt_tokens(&generate),
            }),
        }
    }

    /// Make one call to `provider`, preferring `user_key` over the default key
    async fn attempt(
        &self,
        provider: ProviderId,
        user_key: Option<&str>,
        request: &GenerateRequest,
    ) -> std::result::Result<Generation, RoutingError> {
        let api_key = user_key
            .filter(|k| !k.is_empty())
            .or_else(|| self.default_keys.get(provider))
            .ok_or(RoutingError::MissingCredentials { provider })?;

        let client = self.table.client(provider).ok_or_else(|| RoutingError::Provider {
            provider,
            source: MeshError::ProviderNotFound(provider.to_string()),
        })?;

        match tokio::time::timeout(self.attempt_timeout, client.generate(request, api_key)).await {
            Ok(Ok(generation)) => Ok(generation),
            Ok(Err(source)) => Err(RoutingError::Provider { provider, source }),
            Err(_) => Err(RoutingError::Provider {
                provider,
                source: MeshError::Timeout(format!(
                    "no response within {}ms",
                    self.attempt_timeout.as_millis()
                )),
            }),
        }
    }

    /// Per-user keys; a failed lookup counts as no keys
    async fn user_keys(&self, user_id: Option<&str>) -> ProviderCredentials {
        let Some(user_id) = user_id else {
            return ProviderCredentials::new();
        };

        let lookup = self.credentials.user_api_keys(user_id);
        match tokio::time::timeout(self.attempt_timeout, lookup).await {
            Ok(Ok(keys)) => keys,
            Ok(Err(e)) => {
                warn!(user_id, error = %e, "failed to load user API keys; using defaults");
                ProviderCredentials::new()
            }
            Err(_) => {
                warn!(user_id, "user API key lookup timed out; using defaults");
                ProviderCredentials::new()
            }
        }
    }

    /// Write the usage entry; failures and timeouts are logged and dropped
    async fn record_usage(&self, entry: &UsageLogEntry) {
        let err = match tokio::time::timeout(self.attempt_timeout, self.usage.log(entry)).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => RoutingError::Logging(format!("{:#}", e)),
            Err(_) => RoutingError::Logging(format!(
                "usage write timed out after {}ms",
                self.attempt_timeout.as_millis()
            )),
        };
        warn!(error = %err, model_used = %entry.model_used, "usage entry dropped");
    }
}

/// Low-cost primary answers must pass the quality check
fn quality_gate(
    provider: ProviderId,
    generation: &Generation,
) -> std::result::Result<(), RoutingError> {
    if provider.tier() != Tier::LowCost {
        return Ok(());
    }

    match assess_quality(&generation.text) {
        Some(issue) => Err(RoutingError::QualityRejected { provider, issue }),
        None => Ok(()),
    }
}

fn prompt_tokens(request: &GenerateRequest) -> u32 {
    estimate_tokens(&request.system_prompt).saturating_add(estimate_tokens(&request.prompt))
}

fn answer(
    provider: ProviderId,
    stage: Stage,
    generation: Generation,
    request: &GenerateRequest,
    primary_error: Option<RoutingError>,
) -> RouteAnswer {
    let token_usage = generation
        .usage
        .unwrap_or_else(|| TokenUsage::estimated(prompt_tokens(request), &generation.text));

    RouteAnswer {
        provider,
        stage,
        text: generation.text,
        token_usage,
        primary_error,
    }
}
