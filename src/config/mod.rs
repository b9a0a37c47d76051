//! Configuration Module
//!
//! Handles router configuration loading and validation.

pub mod loader;
pub mod provider;

pub use loader::ConfigLoader;
pub use provider::{DataStoreConfig, ProviderConfig, RouterConfig, RoutingSettings};
