//! Signed, expiring session tokens backed by a shared in-process table.
//!
//! This crate provides:
//! - A [`SessionStore`] that issues `<session_id>.<signature>` tokens and
//!   validates them against its session table
//! - A background sweeper that evicts expired sessions
//! - Save/load of the whole table to a JSON file
//! - Injectable [`Signer`], [`TelemetrySink`] and [`Clock`] capabilities
//!
//! # Example
//!
//! ```rust,ignore
//! use latch_session::{SessionStore, StoreConfig};
//!
//! let store = SessionStore::new(StoreConfig::default());
//! store.start_default_sweeper();
//!
//! let token = store.create_session("s1", "u123", b"secret", Duration::from_secs(300));
//! assert_eq!(store.validate_token(&token, b"secret").as_deref(), Some("u123"));
//! ```

mod clock;
mod config;
mod error;
mod persistence;
mod signer;
mod store;
mod sweeper;
mod table;
pub mod telemetry;
pub mod token;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL, StoreConfig};
pub use error::{Result, SessionError};
pub use persistence::{read_sessions, write_sessions};
pub use signer::{HmacSigner, Signer, constant_time_eq, derive_key, random_salt};
pub use store::{LoadOutcome, SessionStore, SessionStoreBuilder, StoreStats};
pub use sweeper::{SweeperHandle, spawn_sweeper};
pub use table::SessionTable;
pub use telemetry::{
    MemoryTelemetry, NoopTelemetry, TelemetryEvent, TelemetrySink, TelemetrySnapshot,
    TracingTelemetry,
};
pub use types::Session;
