//! Telemetry sinks.
//!
//! The store reports what happened through a [`TelemetrySink`]: named events
//! with a few key/value pairs, plus monotonically increasing counters. Sinks
//! are fire-and-forget; nothing they do can change a store result.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

/// Event and counter names emitted by the store.
pub mod events {
    pub const SESSION_CREATED: &str = "session.created";
    pub const SESSION_EXPIRED: &str = "session.expired";
    pub const SESSION_INVALID_SIG: &str = "session.invalid_sig";
    pub const SESSION_EXPIRED_SEEN: &str = "session.expired_seen";
    pub const SESSION_SAVED: &str = "session.saved";
    pub const SESSION_LOADED: &str = "session.loaded";
    pub const SESSION_LOAD_MISSING: &str = "session.load_missing";
    pub const TOKEN_INVALID_FORMAT: &str = "token.invalid_format";

    /// Incremented on every created session.
    pub const COUNTER_WRITES: &str = "writes";
    /// Incremented on every successful validation.
    pub const COUNTER_READS: &str = "reads";
    /// Incremented on every rejected token.
    pub const COUNTER_FAILS: &str = "fails";
}

/// Number of events [`MemoryTelemetry`] keeps.
pub const DEFAULT_EVENT_CAPACITY: usize = 50;

/// Observability capability used by the session store.
pub trait TelemetrySink: Send + Sync {
    /// Record a named event with metadata.
    fn record_event(&self, name: &str, meta: &[(&str, &str)]);

    /// Increment a named counter by one.
    fn increment(&self, counter: &str);
}

/// Sink that forwards events and counters to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record_event(&self, name: &str, meta: &[(&str, &str)]) {
        info!(target: "latch_session::telemetry", event = name, meta = ?meta, "telemetry event");
    }

    fn increment(&self, counter: &str) {
        debug!(target: "latch_session::telemetry", counter = counter, "counter incremented");
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record_event(&self, _name: &str, _meta: &[(&str, &str)]) {}

    fn increment(&self, _counter: &str) {}
}

/// A recorded telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    /// Seconds since the Unix epoch when the event was recorded.
    pub at: f64,
    pub name: String,
    pub meta: Vec<(String, String)>,
}

impl TelemetryEvent {
    /// Look up a metadata value by key.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Point-in-time copy of a [`MemoryTelemetry`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub counters: HashMap<String, u64>,
    pub events: Vec<TelemetryEvent>,
}

impl TelemetrySnapshot {
    /// Value of a counter, zero if never incremented.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Number of recorded events with the given name.
    pub fn count_events(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name == name).count()
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    counters: HashMap<String, u64>,
    events: VecDeque<TelemetryEvent>,
}

/// In-memory sink keeping all counters and the most recent events.
///
/// Useful for tests and for entry points that want to print a summary.
#[derive(Debug)]
pub struct MemoryTelemetry {
    inner: Mutex<MemoryInner>,
    capacity: usize,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a sink retaining at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryInner::default()),
            capacity,
        }
    }

    /// Copy out the counters and retained events.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let inner = self.inner.lock();
        TelemetrySnapshot {
            counters: inner.counters.clone(),
            events: inner.events.iter().cloned().collect(),
        }
    }
}

impl Default for MemoryTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record_event(&self, name: &str, meta: &[(&str, &str)]) {
        let event = TelemetryEvent {
            at: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            name: name.to_string(),
            meta: meta
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };

        let mut inner = self.inner.lock();
        if self.capacity == 0 {
            return;
        }
        while inner.events.len() >= self.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(event);
    }

    fn increment(&self, counter: &str) {
        let mut inner = self.inner.lock();
        *inner.counters.entry(counter.to_string()).or_insert(0) += 1;
    }
}
