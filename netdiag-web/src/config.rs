//! Server configuration, loaded from a TOML file with defaults.

use std::path::Path;

use serde::Deserialize;

/// Default config file looked up next to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "netdiag.toml";

/// Server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: String,
    /// TCP port for the HTTP/WebSocket listener.
    pub port: u16,
    /// tracing env-filter directive (e.g. `"info"`, `"netdiag_web=debug"`).
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3001,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from `path`; a missing file yields the defaults, a malformed
    /// file is an error.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}
