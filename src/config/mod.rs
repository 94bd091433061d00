pub mod secrets;
pub use secrets::Secrets;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Complete panel configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database connection settings applied to every brokered connection
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// TCP connect timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// How long to wait for a usable server (seconds)
    #[serde(default = "default_timeout_secs")]
    pub server_selection_timeout_secs: u64,
    /// Reported to the server in the connection handshake
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Database that authenticates operator credentials
    #[serde(default = "default_auth_source")]
    pub auth_source: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_app_name() -> String {
    "dbpanel".to_string()
}

fn default_auth_source() -> String {
    "admin".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout_secs(),
            server_selection_timeout_secs: default_timeout_secs(),
            app_name: default_app_name(),
            auth_source: default_auth_source(),
        }
    }
}

impl PanelConfig {
    /// Override fields from environment variables, ignoring unparsable values.
    ///
    /// - `PORT`
    /// - `DBPANEL_HOST`
    /// - `DBPANEL_CONNECT_TIMEOUT_SECS`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Some(v) = lookup("DBPANEL_HOST") {
            if !v.is_empty() {
                self.server.host = v;
            }
        }
        if let Some(v) = lookup("DBPANEL_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.database.connect_timeout_secs = secs;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<PanelConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: PanelConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load configuration from TOML file, or defaults when the file does not exist
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<PanelConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(PanelConfig::default());
    }
    load_config(path)
}
