//! Router Module
//!
//! Provider selection, quality-gated fallback and the provider table.

pub mod engine;
pub mod table;
pub mod types;

pub use engine::{ModelRouter, RouteAnswer, RouteFailure, Stage};
pub use table::{ProviderEntry, ProviderTable};
pub use types::{
    RoutingRequest, RoutingResult, TokenUsage, ERROR_FALLBACK_MODEL, FALLBACK_SUFFIX,
    GRACEFUL_FAILURE_MESSAGE,
};
