//! CLI command handlers.

pub mod demo;
pub mod derive_key;
pub mod issue;
pub mod list;
pub mod validate;

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use latch_session::{LoadOutcome, SessionStore};

use crate::config::LatchConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration.
    pub config: LatchConfig,
    /// Signing secret from `--secret` or `LATCH_SECRET`.
    pub secret: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// The configured secret, required by every command that signs.
    pub fn require_secret(&self) -> Result<&[u8]> {
        match self.secret.as_deref() {
            Some(s) if !s.is_empty() => Ok(s.as_bytes()),
            _ => bail!("No secret configured. Pass --secret or set LATCH_SECRET."),
        }
    }

    /// A store built from the config.
    pub fn store(&self) -> SessionStore {
        SessionStore::new(self.config.store_config())
    }

    /// A store pre-loaded from `path`; a missing file gives an empty store.
    pub fn load_store(&self, path: &Path) -> Result<SessionStore> {
        let store = self.store();
        let outcome = store
            .load_from_disk(path)
            .with_context(|| format!("Failed to load sessions from {}", path.display()))?;
        if outcome == LoadOutcome::Missing {
            tracing::debug!(path = %path.display(), "No session file, starting empty");
        }
        Ok(store)
    }
}
