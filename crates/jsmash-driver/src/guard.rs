//! Guard timer around oracle calls.
//!
//! The oracle runs in its own task. The guard races that task against a
//! deadline; if the deadline wins the task is aborted and the guard is
//! marked as fired. Nothing preempts an oracle stuck in blocking code: the
//! guard only detects the hang and lets the driver walk away from it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, trace};

use crate::error::{DriverError, Result};

/// Result of a guarded call.
#[derive(Debug)]
pub enum Guarded<T> {
    /// The task finished before the deadline.
    Completed(T),
    /// The deadline passed first.
    Fired {
        /// The budget that was exceeded.
        budget: Duration,
    },
}

/// Deadline watcher for oracle tasks.
#[derive(Debug)]
pub struct GuardTimer {
    grace: Duration,
    fired: AtomicU64,
}

impl GuardTimer {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            fired: AtomicU64::new(0),
        }
    }

    /// Slack allowed beyond the oracle's own timeout.
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Budget for a call whose oracle timeout is `timeout`.
    pub fn budget_for(&self, timeout: Duration) -> Duration {
        timeout.saturating_add(self.grace)
    }

    /// How many times the guard has fired.
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Arm the guard for `budget`, wait for `task`, disarm.
    pub async fn watch<T>(&self, budget: Duration, mut task: JoinHandle<T>) -> Result<Guarded<T>>
    where
        T: Send + 'static,
    {
        trace!(budget = ?budget, "Guard timer armed");
        let deadline = tokio::time::sleep(budget);
        tokio::pin!(deadline);

        tokio::select! {
            joined = &mut task => {
                trace!("Guard timer disarmed");
                joined
                    .map(Guarded::Completed)
                    .map_err(|e| DriverError::oracle_task(e.to_string()))
            }
            _ = &mut deadline => {
                task.abort();
                self.fired.fetch_add(1, Ordering::Relaxed);
                error!(budget = ?budget, "Guard timer fired");
                Ok(Guarded::Fired { budget })
            }
        }
    }
}
