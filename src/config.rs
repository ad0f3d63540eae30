//! Service configuration, sourced from environment variables.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8000)
//! - `MESH_EMBEDDER` — Embedding backend: "hashing" (default) or "openai"
//! - `OPENAI_API_KEY` — API key, required when `MESH_EMBEDDER=openai`
//! - `MESH_HEALTH_INTERVAL_SECS` — seconds between health poll cycles (default: 30)
//! - `MESH_HEALTH_TIMEOUT_SECS` — per-agent health probe timeout (default: 5)
//! - `MESH_DISPATCH_TIMEOUT_SECS` — per-agent tool call timeout (default: 120)
//! - `MESH_DISCOVERY_FLOOR` — minimum relevance score kept by discovery (default: 0.0)
//! - `MESH_MAX_RESULTS` — default discovery result cap (default: 5)

use std::time::Duration;

/// Runtime configuration for the discovery and orchestration core.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// HTTP bind port.
    pub port: u16,
    /// Embedding backend name ("hashing" or "openai").
    pub embedder: String,
    /// Interval between health monitor cycles.
    pub health_interval: Duration,
    /// Timeout for a single health probe.
    pub health_timeout: Duration,
    /// Timeout for a single agent tool call.
    pub dispatch_timeout: Duration,
    /// Minimum relevance score retained by discovery. 0.0 disables the floor.
    pub discovery_floor: f32,
    /// Default `max_results` when a discovery request omits it.
    pub max_results: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            embedder: "hashing".to_string(),
            health_interval: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
            dispatch_timeout: Duration::from_secs(120),
            discovery_floor: 0.0,
            max_results: 5,
        }
    }
}

impl MeshConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PORT", defaults.port),
            embedder: std::env::var("MESH_EMBEDDER").unwrap_or(defaults.embedder),
            health_interval: Duration::from_secs(env_parse(
                "MESH_HEALTH_INTERVAL_SECS",
                defaults.health_interval.as_secs(),
            )),
            health_timeout: Duration::from_secs(env_parse(
                "MESH_HEALTH_TIMEOUT_SECS",
                defaults.health_timeout.as_secs(),
            )),
            dispatch_timeout: Duration::from_secs(env_parse(
                "MESH_DISPATCH_TIMEOUT_SECS",
                defaults.dispatch_timeout.as_secs(),
            )),
            discovery_floor: env_parse("MESH_DISCOVERY_FLOOR", defaults.discovery_floor),
            max_results: env_parse("MESH_MAX_RESULTS", defaults.max_results),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
