//! Runtime configuration.
//!
//! Loaded from a YAML file (path in `UCP_CONFIG`, default `ucp.yaml`). A
//! missing file yields the defaults. `LISTEN` overrides the listen address.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "ucp.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ajax: AjaxSettings,
    pub modules: ModulesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Path of the dispatch endpoint. Anything after it is treated as path-info.
    pub script_path: String,
    pub request_timeout_secs: u64,
}

/// Settings handed to every module's admission check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AjaxSettings {
    pub authenticate: bool,
    pub allow_remote: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Business modules the registry may load. `None` allows all registered.
    pub enabled: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            script_path: "/ajax.php".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for AjaxSettings {
    fn default() -> Self {
        Self {
            authenticate: true,
            allow_remote: false,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("UCP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::from_file(Path::new(&path))?;

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}
