//! The session store: issues, validates, sweeps and persists sessions.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::persistence;
use crate::signer::{HmacSigner, Signer};
use crate::sweeper::{SweeperHandle, spawn_sweeper};
use crate::table::SessionTable;
use crate::telemetry::{TelemetrySink, TracingTelemetry, events};
use crate::token;
use crate::types::Session;

/// Outcome of [`SessionStore::load_from_disk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The table was replaced with this many sessions.
    Loaded(usize),
    /// The file did not exist; the table was left alone.
    Missing,
}

/// Point-in-time store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Records currently in the table.
    pub sessions: usize,

    /// Records past their expiry that the sweeper has not removed yet.
    pub expired_pending: usize,

    /// Whether a sweeper task is running.
    pub sweeper_running: bool,
}

struct StoreInner {
    table: SessionTable,
    signer: Arc<dyn Signer>,
    telemetry: Arc<dyn TelemetrySink>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    sweeper_started: AtomicBool,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl StoreInner {
    /// One sweep: evict under the table lock, report after releasing it.
    fn sweep(&self) -> Vec<String> {
        let now = self.clock.now();
        let evicted = self.table.remove_expired(now);

        for session_id in &evicted {
            debug!(session_id = %session_id, "Evicted expired session");
            self.telemetry
                .record_event(events::SESSION_EXPIRED, &[("sid", session_id)]);
        }

        evicted
    }
}

/// Builder for a [`SessionStore`] with custom capabilities.
pub struct SessionStoreBuilder {
    config: StoreConfig,
    signer: Arc<dyn Signer>,
    telemetry: Arc<dyn TelemetrySink>,
    clock: Arc<dyn Clock>,
}

impl SessionStoreBuilder {
    /// Use a different signer.
    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    /// Use a different telemetry sink.
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Use a different clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> SessionStore {
        SessionStore {
            inner: Arc::new(StoreInner {
                table: SessionTable::new(),
                signer: self.signer,
                telemetry: self.telemetry,
                clock: self.clock,
                config: self.config,
                sweeper_started: AtomicBool::new(false),
                sweeper: Mutex::new(None),
            }),
        }
    }
}

/// In-process session store.
///
/// Owns the session table and the sweeper. Clones share the same table, so
/// a store can be handed to request handlers and background tasks alike.
///
/// All operations are synchronous and only block on the table lock; the
/// lock is never held while signing, emitting telemetry or touching disk.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Create a store with HMAC signing, `tracing` telemetry and the system clock.
    pub fn new(config: StoreConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start building a store with custom capabilities.
    pub fn builder(config: StoreConfig) -> SessionStoreBuilder {
        SessionStoreBuilder {
            config,
            signer: Arc::new(HmacSigner),
            telemetry: Arc::new(TracingTelemetry),
            clock: Arc::new(SystemClock),
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Create (or overwrite) a session and return its token.
    ///
    /// A zero `ttl` creates a session that is already expired. Never fails.
    pub fn create_session(
        &self,
        session_id: &str,
        user_id: &str,
        secret: &[u8],
        ttl: Duration,
    ) -> String {
        let inner = &self.inner;
        let signature = inner.signer.sign(session_id, secret);

        let session = Session::new(user_id, inner.clock.now(), ttl);
        if inner.table.insert(session_id, session).is_some() {
            debug!(session_id = %session_id, "Replaced existing session");
        }

        inner.telemetry.increment(events::COUNTER_WRITES);
        inner.telemetry.record_event(
            events::SESSION_CREATED,
            &[("sid", session_id), ("user", user_id)],
        );

        token::encode(session_id, &signature)
    }

    /// Create a session using the configured default TTL.
    pub fn create_session_default(&self, session_id: &str, user_id: &str, secret: &[u8]) -> String {
        self.create_session(session_id, user_id, secret, self.inner.config.default_ttl)
    }

    /// Validate a token and return the user it was issued to.
    ///
    /// Every rejection looks the same to the caller; only telemetry tells
    /// a malformed token, a bad signature, an unknown session and an
    /// expired session apart. Validation never modifies the table.
    pub fn validate_token(&self, token: &str, secret: &[u8]) -> Option<String> {
        let inner = &self.inner;

        let Some((session_id, signature)) = token::decode(token) else {
            self.reject(events::TOKEN_INVALID_FORMAT, &[]);
            return None;
        };

        let expected = inner.signer.sign(session_id, secret);
        if !inner.signer.verify(&expected, signature) {
            self.reject(events::SESSION_INVALID_SIG, &[("sid", session_id)]);
            return None;
        }

        let lookup = inner.table.with_session(session_id, |session| match session {
            None => Lookup::Missing,
            Some(s) if s.is_expired_at(inner.clock.now()) => Lookup::Expired,
            Some(s) => Lookup::Valid(s.user_id.clone()),
        });

        match lookup {
            Lookup::Valid(user_id) => {
                trace!(session_id = %session_id, "Token validated");
                inner.telemetry.increment(events::COUNTER_READS);
                Some(user_id)
            }
            Lookup::Expired => {
                self.reject(events::SESSION_EXPIRED_SEEN, &[("sid", session_id)]);
                None
            }
            Lookup::Missing => {
                debug!(session_id = %session_id, "Token for unknown session");
                inner.telemetry.increment(events::COUNTER_FAILS);
                None
            }
        }
    }

    fn reject(&self, event: &str, meta: &[(&str, &str)]) {
        debug!(reason = event, "Token rejected");
        self.inner.telemetry.increment(events::COUNTER_FAILS);
        self.inner.telemetry.record_event(event, meta);
    }

    /// Start the background sweeper.
    ///
    /// Only the first call starts a task; later calls are no-ops and return
    /// `false`, even after the sweeper has been stopped. Must be called from
    /// within a Tokio runtime; outside one nothing is started.
    pub fn start_sweeper(&self, every: Duration) -> bool {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No Tokio runtime available, session sweeper not started");
            return false;
        }
        if self.inner.sweeper_started.swap(true, Ordering::SeqCst) {
            return false;
        }

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let handle = spawn_sweeper(every, move || weak.upgrade().map(|inner| inner.sweep()));
        *self.inner.sweeper.lock() = Some(handle);
        true
    }

    /// Start the sweeper with the configured interval.
    pub fn start_default_sweeper(&self) -> bool {
        self.start_sweeper(self.inner.config.sweep_interval)
    }

    /// Signal the sweeper to stop without waiting for it.
    ///
    /// Returns `false` if no sweeper was running.
    pub fn stop_sweeper(&self) -> bool {
        match self.inner.sweeper.lock().as_ref() {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Stop the sweeper and wait for its task to exit.
    pub async fn shutdown(&self) {
        let handle = self.inner.sweeper.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
            debug!("Session sweeper shut down");
        }
    }

    /// Run one sweep now and return the evicted session ids.
    ///
    /// This is exactly what each sweeper tick does.
    pub fn sweep_now(&self) -> Vec<String> {
        self.inner.sweep()
    }

    /// Write every session to `path`, replacing any existing file.
    pub fn save_to_disk(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.inner.table.snapshot();

        persistence::write_sessions(path, &snapshot)?;

        let path_str = path.display().to_string();
        self.inner
            .telemetry
            .record_event(events::SESSION_SAVED, &[("path", &path_str)]);
        Ok(())
    }

    /// Replace the whole table with the sessions stored at `path`.
    ///
    /// A missing file is not an error and leaves the table untouched, as
    /// does a file that fails to read or parse. Expired records are loaded
    /// as-is and left for the sweeper.
    pub fn load_from_disk(&self, path: impl AsRef<Path>) -> Result<LoadOutcome> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let Some(sessions) = persistence::read_sessions(path)? else {
            debug!(path = %path.display(), "No session file to load");
            self.inner
                .telemetry
                .record_event(events::SESSION_LOAD_MISSING, &[("path", &path_str)]);
            return Ok(LoadOutcome::Missing);
        };

        let count = sessions.len();
        self.inner.table.replace_all(sessions);

        self.inner
            .telemetry
            .record_event(events::SESSION_LOADED, &[("path", &path_str)]);
        Ok(LoadOutcome::Loaded(count))
    }

    /// Copy of a session record.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.inner.table.get(session_id)
    }

    /// Copy of every session record.
    pub fn sessions(&self) -> std::collections::HashMap<String, Session> {
        self.inner.table.snapshot()
    }

    /// Whether a record exists for `session_id`, expired or not.
    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.table.contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.inner.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.table.is_empty()
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            sessions: self.inner.table.len(),
            expired_pending: self.inner.table.count_expired(self.inner.clock.now()),
            sweeper_running: self
                .inner
                .sweeper
                .lock()
                .as_ref()
                .is_some_and(|h| h.is_running()),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.inner.table.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

enum Lookup {
    Valid(String),
    Expired,
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::telemetry::MemoryTelemetry;
    use tempfile::tempdir;

    const SECRET: &[u8] = b"K";
    const START: f64 = 1_700_000_000.0;

    struct Harness {
        store: SessionStore,
        clock: Arc<ManualClock>,
        telemetry: Arc<MemoryTelemetry>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(START));
        let telemetry = Arc::new(MemoryTelemetry::new());
        let store = SessionStore::builder(StoreConfig::default())
            .clock(clock.clone())
            .telemetry(telemetry.clone())
            .build();
        Harness {
            store,
            clock,
            telemetry,
        }
    }

    #[test]
    fn test_create_and_validate() {
        let h = harness();
        let token = h
            .store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        assert!(token.starts_with("s1."));
        assert_eq!(h.store.validate_token(&token, SECRET), Some("u1".to_string()));

        let snap = h.telemetry.snapshot();
        assert_eq!(snap.counter(events::COUNTER_WRITES), 1);
        assert_eq!(snap.counter(events::COUNTER_READS), 1);
        assert_eq!(snap.counter(events::COUNTER_FAILS), 0);
        assert_eq!(snap.count_events(events::SESSION_CREATED), 1);
    }

    #[test]
    fn test_token_signature_is_hmac_of_session_id() {
        let h = harness();
        let token = h
            .store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));
        assert_eq!(token, format!("s1.{}", HmacSigner.sign("s1", SECRET)));
    }

    #[test]
    fn test_record_timestamps() {
        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        let session = h.store.get("s1").unwrap();
        assert_eq!(session.created_at, START);
        assert_eq!(session.expires_at, START + 5.0);
    }

    #[test]
    fn test_expiry_boundary() {
        let h = harness();
        let token = h
            .store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        h.clock.set(START + 4.999);
        assert_eq!(h.store.validate_token(&token, SECRET), Some("u1".to_string()));

        h.clock.set(START + 5.0);
        assert_eq!(h.store.validate_token(&token, SECRET), None);

        // Still physically present: validation never evicts.
        assert!(h.store.contains("s1"));
        let snap = h.telemetry.snapshot();
        assert_eq!(snap.count_events(events::SESSION_EXPIRED_SEEN), 1);
        assert_eq!(snap.counter(events::COUNTER_FAILS), 1);
    }

    #[test]
    fn test_validation_does_not_extend_session() {
        let h = harness();
        let token = h
            .store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        for _ in 0..4 {
            h.clock.advance(Duration::from_secs(1));
            assert!(h.store.validate_token(&token, SECRET).is_some());
        }
        h.clock.advance(Duration::from_secs(1));
        assert!(h.store.validate_token(&token, SECRET).is_none());
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let h = harness();
        let token = h.store.create_session("s1", "u1", SECRET, Duration::ZERO);

        assert!(h.store.contains("s1"));
        assert_eq!(h.store.validate_token(&token, SECRET), None);
    }

    #[test]
    fn test_overwrite_replaces_user() {
        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));
        let token = h
            .store
            .create_session("s1", "u2", SECRET, Duration::from_secs(5));

        assert_eq!(h.store.len(), 1);
        assert_eq!(h.store.validate_token(&token, SECRET), Some("u2".to_string()));
    }

    #[test]
    fn test_invalid_format() {
        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        assert_eq!(h.store.validate_token("s1", SECRET), None);
        assert_eq!(h.store.validate_token("", SECRET), None);
        assert_eq!(h.store.validate_token("s1.", SECRET), None);

        let snap = h.telemetry.snapshot();
        assert_eq!(snap.count_events(events::TOKEN_INVALID_FORMAT), 3);
        assert_eq!(snap.counter(events::COUNTER_FAILS), 3);
    }

    #[test]
    fn test_wrong_signature_does_not_touch_table() {
        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));
        let before = h.store.sessions();

        assert_eq!(h.store.validate_token("s1.deadbeef", SECRET), None);

        assert_eq!(h.store.sessions(), before);
        let snap = h.telemetry.snapshot();
        assert_eq!(snap.count_events(events::SESSION_INVALID_SIG), 1);
        assert_eq!(snap.counter(events::COUNTER_FAILS), 1);
    }

    #[test]
    fn test_every_single_character_flip_is_rejected() {
        let h = harness();
        let token = h
            .store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));
        let (id, sig) = token.rsplit_once('.').unwrap();

        for i in 0..sig.len() {
            let mut chars: Vec<char> = sig.chars().collect();
            chars[i] = if chars[i] == '0' { '1' } else { '0' };
            let tampered = format!("{}.{}", id, chars.into_iter().collect::<String>());
            assert_eq!(h.store.validate_token(&tampered, SECRET), None, "flip at {}", i);
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let h = harness();
        let token = h
            .store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));
        assert_eq!(h.store.validate_token(&token, b"other"), None);
    }

    #[test]
    fn test_unknown_session_with_valid_signature() {
        let h = harness();
        let token = token::encode("ghost", &HmacSigner.sign("ghost", SECRET));

        assert_eq!(h.store.validate_token(&token, SECRET), None);
        assert_eq!(h.telemetry.snapshot().counter(events::COUNTER_FAILS), 1);
    }

    #[test]
    fn test_session_id_containing_delimiter_round_trips() {
        let h = harness();
        let token = h
            .store
            .create_session("tenant.a.s1", "u1", SECRET, Duration::from_secs(5));
        assert_eq!(h.store.validate_token(&token, SECRET), Some("u1".to_string()));
    }

    #[test]
    fn test_default_ttl() {
        let h = harness();
        h.store.create_session_default("s1", "u1", SECRET);
        assert_eq!(h.store.get("s1").unwrap().expires_at, START + 10.0);
    }

    #[test]
    fn test_sweep_now_emits_one_event_per_eviction() {
        let h = harness();
        h.store
            .create_session("a", "u1", SECRET, Duration::from_secs(1));
        h.store
            .create_session("b", "u2", SECRET, Duration::from_secs(2));
        h.store
            .create_session("c", "u3", SECRET, Duration::from_secs(60));

        h.clock.advance(Duration::from_secs(2));
        assert_eq!(h.store.stats().expired_pending, 2);

        let mut evicted = h.store.sweep_now();
        evicted.sort();
        assert_eq!(evicted, vec!["a".to_string(), "b".to_string()]);
        assert!(h.store.sweep_now().is_empty());

        let snap = h.telemetry.snapshot();
        assert_eq!(snap.count_events(events::SESSION_EXPIRED), 2);
        assert_eq!(h.store.len(), 1);
        assert_eq!(h.store.stats().expired_pending, 0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));
        h.store
            .create_session("s2", "u2", SECRET, Duration::from_secs(50));

        h.store.save_to_disk(&path).unwrap();

        let other = harness();
        other
            .store
            .create_session("stale", "u9", SECRET, Duration::from_secs(5));
        assert_eq!(other.store.load_from_disk(&path).unwrap(), LoadOutcome::Loaded(2));

        assert_eq!(other.store.sessions(), h.store.sessions());
        assert!(!other.store.contains("stale"));

        assert_eq!(h.telemetry.snapshot().count_events(events::SESSION_SAVED), 1);
        assert_eq!(
            other.telemetry.snapshot().count_events(events::SESSION_LOADED),
            1
        );
    }

    #[test]
    fn test_load_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        let outcome = h.store.load_from_disk(dir.path().join("absent.json")).unwrap();

        assert_eq!(outcome, LoadOutcome::Missing);
        assert!(h.store.contains("s1"));
        let snap = h.telemetry.snapshot();
        assert_eq!(snap.count_events(events::SESSION_LOAD_MISSING), 1);
        assert!(snap.events.last().unwrap().meta("path").is_some());
    }

    #[test]
    fn test_load_malformed_file_leaves_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{not json").unwrap();

        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        assert!(h.store.load_from_disk(&path).is_err());
        assert!(h.store.contains("s1"));
        assert_eq!(h.store.len(), 1);
    }

    #[test]
    fn test_save_failure_propagates() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();

        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(5));

        assert!(h.store.save_to_disk(blocker.join("sessions.json")).is_err());
        assert!(h.store.contains("s1"));
        assert_eq!(h.telemetry.snapshot().count_events(events::SESSION_SAVED), 0);
    }

    #[test]
    fn test_loaded_expired_records_wait_for_sweeper() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let h = harness();
        h.store
            .create_session("s1", "u1", SECRET, Duration::from_secs(1));
        h.store.save_to_disk(&path).unwrap();

        h.clock.advance(Duration::from_secs(10));
        h.store.load_from_disk(&path).unwrap();

        assert!(h.store.contains("s1"));
        assert_eq!(h.store.sweep_now(), vec!["s1".to_string()]);
    }

    #[test]
    fn test_start_sweeper_outside_runtime_does_nothing() {
        let h = harness();
        assert!(!h.store.start_sweeper(Duration::from_millis(10)));
        assert!(!h.store.stats().sweeper_running);
    }

    #[tokio::test]
    async fn test_start_sweeper_is_idempotent() {
        let h = harness();
        h.store.create_session("s1", "u1", SECRET, Duration::ZERO);

        assert!(h.store.start_sweeper(Duration::from_millis(10)));
        assert!(!h.store.start_sweeper(Duration::from_millis(10)));
        assert!(!h.store.start_default_sweeper());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!h.store.contains("s1"));
        assert_eq!(h.telemetry.snapshot().count_events(events::SESSION_EXPIRED), 1);
        assert!(h.store.stats().sweeper_running);

        h.store.shutdown().await;
        assert!(!h.store.stats().sweeper_running);
    }

    #[tokio::test]
    async fn test_stopped_sweeper_stays_stopped() {
        let h = harness();
        assert!(!h.store.stop_sweeper());
        assert!(h.store.start_sweeper(Duration::from_millis(10)));
        assert!(h.store.stop_sweeper());

        tokio::time::sleep(Duration::from_millis(50)).await;
        h.store.create_session("s1", "u1", SECRET, Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(h.store.contains("s1"));
        assert!(!h.store.start_sweeper(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_store_dropped() {
        let h = harness();
        h.store.start_sweeper(Duration::from_millis(5));
        let handle = h.store.inner.sweeper.lock().take().unwrap();

        drop(h);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!handle.is_running());
    }
}
