//! Session record types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One authenticated session, as held in the session table.
///
/// The session identifier is the table key and is not repeated here.
/// Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSession")]
pub struct Session {
    /// Opaque identifier of the authenticated principal.
    pub user_id: String,

    /// When the session was created. Never changes.
    pub created_at: f64,

    /// When the session stops being valid. Never renewed.
    pub expires_at: f64,
}

impl Session {
    /// Create a session starting at `now` and lasting `ttl`.
    pub fn new(user_id: impl Into<String>, now: f64, ttl: Duration) -> Self {
        Self {
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + ttl.as_secs_f64(),
        }
    }

    /// A session is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: f64) -> bool {
        self.expires_at <= now
    }

    /// Seconds left before expiry, zero once expired.
    pub fn remaining_at(&self, now: f64) -> f64 {
        (self.expires_at - now).max(0.0)
    }
}

/// On-disk shape of a session.
///
/// `user` and `expires` are accepted for files written by older tooling;
/// `created_at` may be missing there, in which case it falls back to the
/// expiry time.
#[derive(Deserialize)]
struct StoredSession {
    #[serde(alias = "user")]
    user_id: String,
    #[serde(default)]
    created_at: Option<f64>,
    #[serde(alias = "expires")]
    expires_at: f64,
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            user_id: stored.user_id,
            created_at: stored.created_at.unwrap_or(stored.expires_at),
            expires_at: stored.expires_at,
        }
    }
}
