//! Background eviction of expired sessions.
//!
//! The sweeper is a Tokio task that calls a sweep function on a fixed
//! interval until its cancellation token fires or the sweep function reports
//! that its store is gone.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Smallest interval the sweeper will tick at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Check if the sweeper task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Ask the sweeper to stop after its current tick.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await
            && e.is_panic()
        {
            tracing::error!(error = %e, "Session sweeper panicked");
        }
    }
}

/// Spawn a sweeper on the current Tokio runtime.
///
/// `sweep` runs once per tick and returns the ids it evicted, or `None` when
/// there is nothing left to sweep for, which ends the task. The first tick
/// fires one full interval after spawning.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn spawn_sweeper<F>(every: Duration, mut sweep: F) -> SweeperHandle
where
    F: FnMut() -> Option<Vec<String>> + Send + 'static,
{
    let every = every.max(MIN_SWEEP_INTERVAL);
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        debug!(interval_ms = every.as_millis() as u64, "Session sweeper started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Session sweeper cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match sweep() {
                        Some(evicted) if !evicted.is_empty() => {
                            info!(evicted = evicted.len(), "Session sweep completed");
                        }
                        Some(_) => {
                            debug!("Session sweep: no expired sessions");
                        }
                        None => {
                            debug!("Session store dropped, sweeper exiting");
                            break;
                        }
                    }
                }
            }
        }
    });

    SweeperHandle { cancel, task }
}
