//! Configuration for the session store.

use std::path::PathBuf;
use std::time::Duration;

/// Default interval between sweeper ticks.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2);

/// Default session lifetime used when callers don't pick one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How often the sweeper scans the table for expired sessions.
    pub sweep_interval: Duration,

    /// Session lifetime applied by [`SessionStore::create_session_default`].
    ///
    /// [`SessionStore::create_session_default`]: crate::SessionStore::create_session_default
    pub default_ttl: Duration,

    /// Session file used by the entry point for save/load, if any.
    pub persist_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            default_ttl: DEFAULT_TTL,
            persist_path: None,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweeper interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the default session lifetime.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the session file path.
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }
}
