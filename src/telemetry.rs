//! Logging setup for hosts that embed the router

use crate::error::{MeshError, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "MESH_ROUTER_LOG";

/// Install a fmt subscriber filtered by `MESH_ROUTER_LOG` (default `mesh_router=info`).
///
/// Returns an error instead of panicking if a global subscriber is already set.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new("mesh_router=info"))
        .map_err(|e| MeshError::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| MeshError::Internal(format!("Failed to install subscriber: {}", e)))
}
