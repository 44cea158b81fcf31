//! The shared session table.
//!
//! Every access goes through one mutex and each method holds it only for the
//! in-memory work it does. Callers get owned data back and do signing,
//! telemetry and file I/O after the guard is dropped.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::types::Session;

/// Mapping from session id to session record, guarded by a single lock.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a session. Returns the record it replaced.
    pub fn insert(&self, session_id: &str, session: Session) -> Option<Session> {
        let mut sessions = self.sessions.lock();
        let replaced = sessions.insert(session_id.to_string(), session);
        trace!(session_id = %session_id, size = sessions.len(), "Session inserted");
        replaced
    }

    /// Run `f` against the record for `session_id` while holding the lock.
    ///
    /// Lets a caller check existence and expiry in one critical section.
    pub fn with_session<R>(&self, session_id: &str, f: impl FnOnce(Option<&Session>) -> R) -> R {
        let sessions = self.sessions.lock();
        f(sessions.get(session_id))
    }

    /// Copy of a single record.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.with_session(session_id, |s| s.cloned())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Number of records already past their expiry but not yet removed.
    pub fn count_expired(&self, now: f64) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.is_expired_at(now))
            .count()
    }

    /// Remove every record expired at `now` and return their ids.
    pub fn remove_expired(&self, now: f64) -> Vec<String> {
        let mut sessions = self.sessions.lock();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired_at(now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }

    /// Consistent copy of the whole table.
    pub fn snapshot(&self) -> HashMap<String, Session> {
        self.sessions.lock().clone()
    }

    /// Replace the whole table with `sessions` in one critical section.
    pub fn replace_all(&self, sessions: HashMap<String, Session>) {
        let mut guard = self.sessions.lock();
        guard.clear();
        guard.extend(sessions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(user: &str, now: f64, ttl_secs: u64) -> Session {
        Session::new(user, now, Duration::from_secs(ttl_secs))
    }

    #[test]
    fn test_insert_and_get() {
        let table = SessionTable::new();
        assert!(table.insert("s1", session("u1", 0.0, 10)).is_none());

        assert!(table.contains("s1"));
        assert_eq!(table.get("s1").unwrap().user_id, "u1");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_overwrites() {
        let table = SessionTable::new();
        table.insert("s1", session("u1", 0.0, 10));
        let replaced = table.insert("s1", session("u2", 0.0, 10)).unwrap();

        assert_eq!(replaced.user_id, "u1");
        assert_eq!(table.get("s1").unwrap().user_id, "u2");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_expired_only_removes_expired() {
        let table = SessionTable::new();
        table.insert("old", session("u1", 0.0, 5));
        table.insert("edge", session("u2", 0.0, 10));
        table.insert("live", session("u3", 0.0, 60));

        assert_eq!(table.count_expired(10.0), 2);
        let mut removed = table.remove_expired(10.0);
        removed.sort();

        assert_eq!(removed, vec!["edge".to_string(), "old".to_string()]);
        assert!(table.contains("live"));
        assert_eq!(table.len(), 1);
        assert!(table.remove_expired(10.0).is_empty());
    }

    #[test]
    fn test_replace_all_discards_previous_contents() {
        let table = SessionTable::new();
        table.insert("a", session("u1", 0.0, 10));

        let mut incoming = HashMap::new();
        incoming.insert("b".to_string(), session("u2", 0.0, 10));
        table.replace_all(incoming);

        assert!(!table.contains("a"));
        assert!(table.contains("b"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let table = SessionTable::new();
        table.insert("a", session("u1", 0.0, 10));
        let snap = table.snapshot();
        table.insert("b", session("u2", 0.0, 10));

        assert_eq!(snap.len(), 1);
        assert_eq!(table.len(), 2);
    }
}
