use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::http::parser::DEFAULT_MAX_REQUEST_BYTES;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "HTTPWIRE_CONFIG";
/// Environment variable overriding `listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Largest request (line, headers and body) a connection may buffer
    pub max_request_bytes: usize,
    pub upstream: UpstreamConfig,
}

/// Where `/httpbin/*` requests are relayed to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Plain `http://` base URL
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Upper bound on the size of each relayed chunk
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:42069".to_string(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://httpbin.org".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            chunk_size: 1024,
        }
    }
}

impl Config {
    /// Loads the YAML file named by `HTTPWIRE_CONFIG`, if any, then applies
    /// the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("Failed to parse YAML config")?;
        anyhow::ensure!(cfg.upstream.chunk_size > 0, "upstream.chunk_size must be positive");
        Ok(cfg)
    }
}
