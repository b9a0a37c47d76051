//! Mesh Router - model routing for the MeshMemory assistant
//!
//! Picks an LLM provider for each prompt, rejects weak answers from the
//! low-cost provider, falls back exactly once, and records one usage entry
//! per call. `ModelRouter::route` never fails; total failure is reported
//! through `model_used == "error-fallback"`.
//!
//! ```no_run
//! use mesh_router::{ModelRouter, RoutingRequest};
//!
//! # async fn run() -> mesh_router::Result<()> {
//! let router = ModelRouter::from_default_config()?;
//! let result = router
//!     .route(RoutingRequest::new("Summarize my notes from Tuesday").with_user("user-123"))
//!     .await;
//!
//! if result.is_error_fallback() {
//!     eprintln!("no provider could answer");
//! }
//! println!("{} ({} tokens)", result.response_text, result.token_usage.total());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod heuristics;
pub mod provider;
pub mod router;
pub mod telemetry;
pub mod usage;

pub use config::{ConfigLoader, RouterConfig};
pub use credentials::{CredentialStore, DefaultKeys, StaticCredentialStore};
pub use error::{MeshError, Result, RoutingError};
pub use heuristics::{estimate_tokens, is_low_quality, needs_advanced_reasoning};
pub use provider::{ChatProvider, ProviderId};
pub use router::{
    ModelRouter, ProviderTable, RoutingRequest, RoutingResult, TokenUsage, ERROR_FALLBACK_MODEL,
    GRACEFUL_FAILURE_MESSAGE,
};
pub use telemetry::init_tracing;
pub use usage::{MemoryUsageLogger, UsageLogEntry, UsageLogger};
