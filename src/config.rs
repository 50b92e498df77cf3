//! Configuration loading (`spec.md` §6, `SPEC_FULL.md` §6.1).
//!
//! Grounded in `crates/req-urls/src/config.rs`'s `Config::load` shape
//! (open the file, read it to a string, deserialize, wrap errors), adapted
//! to TOML and to this proxy's schema.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ProxyError;

fn default_port() -> u16 {
    8000
}

fn default_max_threads() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_threads: default_max_threads(),
        }
    }
}

fn default_node_port() -> u16 {
    80
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    #[serde(default = "default_node_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

impl Config {
    /// Loads and validates a config document from `path`. A missing/empty
    /// `nodes` list is a `ConfigError` — the process is meant to exit
    /// before accepting any connections (`spec.md` §7, §9 open question).
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ProxyError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ProxyError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| ProxyError::ConfigError(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProxyError> {
        if self.nodes.is_empty() {
            return Err(ProxyError::ConfigError(
                "at least one upstream node must be configured".to_string(),
            ));
        }
        Ok(())
    }
}
