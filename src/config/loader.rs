//! Configuration Loader
//!
//! Handles loading and merging router configuration from multiple sources.

use crate::config::provider::{DataStoreConfig, ProviderConfig, RouterConfig, RoutingSettings};
use crate::error::{MeshError, Result};
use crate::provider::ProviderId;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A partial configuration layered over the built-in defaults
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    #[serde(default)]
    providers: HashMap<ProviderId, ProviderConfig>,

    #[serde(default)]
    routing: Option<RoutingSettings>,

    #[serde(default)]
    data_store: Option<DataStoreConfig>,
}

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: RouterConfig,
}

impl ConfigLoader {
    /// Create a new config loader and load from default locations
    pub fn new() -> Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut loader = Self::builtin()?;

        // File system configs can override built-ins
        for path in Self::get_config_paths() {
            if path.exists() {
                loader.load_from_file(&path)?;
            }
        }

        Ok(loader)
    }

    /// Create a loader with a specific config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::builtin()?;
        loader.load_from_file(path)?;
        Ok(loader)
    }

    /// Loader holding only the built-in defaults
    fn builtin() -> Result<Self> {
        let defaults = include_str!("../../router.json");
        let config: RouterConfig = serde_json::from_str(defaults).map_err(|e| {
            MeshError::Config(format!("Failed to parse built-in router.json: {}", e))
        })?;

        Ok(Self { config })
    }

    /// Get list of config paths to check
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Environment variable
        if let Ok(custom_path) = std::env::var("MESH_ROUTER_CONFIG") {
            paths.push(PathBuf::from(custom_path));
        }

        // 2. Current directory
        paths.push(PathBuf::from("mesh-router.json"));

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mesh-router").join("config.json"));
        }

        // 4. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".mesh-router").join("config.json"));
        }

        paths
    }

    /// Load configuration from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MeshError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let overlay: ConfigOverlay = serde_json::from_str(&content).map_err(|e| {
            MeshError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "loaded router config");
        self.merge(overlay);
        Ok(())
    }

    /// Merge an overlay into this config (later sources override earlier)
    fn merge(&mut self, overlay: ConfigOverlay) {
        self.config.providers.extend(overlay.providers);

        if let Some(routing) = overlay.routing {
            self.config.routing = routing;
        }

        if let Some(data_store) = overlay.data_store {
            self.config.data_store = Some(data_store);
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> RouterConfig {
        self.config
    }
}
