//! Error types for session store operations.

use std::path::PathBuf;

/// Error type for session store operations.
///
/// Token validation never produces one of these: a rejected token is a
/// routine `None`. Only persistence can fail.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading, writing or renaming a session file failed.
    #[error("I/O error on session file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A session file did not contain a valid session mapping.
    #[error("failed to parse session file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The session table could not be serialized.
    #[error("failed to serialize sessions: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, SessionError>;
