//! Configuration file loading.
//!
//! The CLI reads an optional TOML file:
//!
//! ```toml
//! [store]
//! sweep_interval_secs = 2
//! default_ttl_secs = 10
//! persist_path = "sessions.json"
//! ```
//!
//! An explicitly requested file must exist. Without one, `latch.toml` in the
//! working directory is used when present, and built-in defaults otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use latch_session::StoreConfig;
use serde::Deserialize;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "latch.toml";

/// Session file used when neither the command line nor the config names one.
pub const DEFAULT_SESSION_FILE: &str = "sessions.json";

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level config file contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LatchConfig {
    pub store: StoreSection,
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Seconds between sweeper ticks.
    pub sweep_interval_secs: f64,
    /// Lifetime of sessions issued without an explicit TTL.
    pub default_ttl_secs: f64,
    /// Session file used by `issue`, `validate` and `list`.
    pub persist_path: Option<PathBuf>,
}

impl Default for StoreSection {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            sweep_interval_secs: defaults.sweep_interval.as_secs_f64(),
            default_ttl_secs: defaults.default_ttl.as_secs_f64(),
            persist_path: None,
        }
    }
}

impl LatchConfig {
    /// Build the store configuration. Negative durations clamp to zero.
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new()
            .with_sweep_interval(secs(self.store.sweep_interval_secs))
            .with_default_ttl(secs(self.store.default_ttl_secs));
        if let Some(path) = &self.store.persist_path {
            config = config.with_persist_path(path);
        }
        config
    }

    /// Resolve the session file: explicit flag, then config, then default.
    pub fn session_file(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.store.persist_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE))
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::ZERO)
}

/// Load configuration from an explicit path or the working directory.
pub fn load_config(explicit: Option<&Path>) -> Result<LatchConfig> {
    match explicit {
        Some(path) => load_config_file(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                load_config_file(path)
            } else {
                Ok(LatchConfig::default())
            }
        }
    }
}

/// Load a specific config file.
pub fn load_config_file(path: &Path) -> Result<LatchConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let config: LatchConfig = toml::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}
