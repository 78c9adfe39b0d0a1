//! TOML configuration parsing and validation.
//!
//! ```toml
//! [source]
//! provider = "http"                  # "http" or "file"
//! base_url = "http://127.0.0.1:8000" # http only; this is the default
//! dir = "./analyses"                 # required for file
//! timeout_secs = 30
//! max_retries = 3
//! retry_backoff_ms = 500
//!
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! tierlist_core = "debug"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            dir: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_provider() -> String {
    "http".to_string()
}
fn default_base_url() -> Option<String> {
    Some("http://127.0.0.1:8000".to_string())
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Global filter level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub default: String,
    /// Per-target overrides, e.g. `tierlist_core = "debug"`.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Built-in configuration used when no config file exists: HTTP source
    /// against a local backend, quiet logging.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Load and validate the config at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    let source = &config.source;

    match source.provider.as_str() {
        "http" => match source.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {}
            _ => anyhow::bail!("source.base_url must be set when provider is 'http'"),
        },
        "file" => {
            if source.dir.is_none() {
                anyhow::bail!("source.dir must be set when provider is 'file'");
            }
        }
        other => anyhow::bail!(
            "Unknown source provider: '{}'. Must be http or file.",
            other
        ),
    }

    if source.timeout_secs == 0 {
        anyhow::bail!("source.timeout_secs must be > 0");
    }

    match config.logging.default.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => {}
        other => anyhow::bail!("Unknown logging.default level: '{}'", other),
    }

    Ok(())
}
