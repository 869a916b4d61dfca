//! Run state and the pause control shared with the outside world.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::{RunMode, SessionSettings};

/// Lifecycle of a driver.
///
/// `Idle -> Generating -> Running(mode) -> Generating ... -> Finished`, with
/// `Paused` entered between steps while a pause is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// Not started.
    Idle,
    /// Producing the next program.
    Generating,
    /// Waiting for the oracle.
    Running(RunMode),
    /// Waiting for a resume.
    Paused,
    /// Shut down; terminal.
    Finished,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverState::Idle => write!(f, "idle"),
            DriverState::Generating => write!(f, "generating"),
            DriverState::Running(mode) => write!(f, "running ({mode})"),
            DriverState::Paused => write!(f, "paused"),
            DriverState::Finished => write!(f, "finished"),
        }
    }
}

/// What the controller asks of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Pause,
    Stop,
}

/// Cloneable handle for pausing, resuming and stopping a driver.
///
/// Requests take effect before the next step. A stop is final: later pause
/// or resume requests are ignored.
#[derive(Debug, Clone)]
pub struct PauseControl {
    tx: Arc<watch::Sender<ControlSignal>>,
}

impl Default for PauseControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseControl {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ControlSignal::Run);
        Self { tx: Arc::new(tx) }
    }

    pub fn pause(&self) {
        self.set(ControlSignal::Pause);
    }

    pub fn resume(&self) {
        self.set(ControlSignal::Run);
    }

    /// Ask the driver to finish after the current step.
    pub fn stop(&self) {
        self.set(ControlSignal::Stop);
    }

    pub fn signal(&self) -> ControlSignal {
        *self.tx.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.signal() == ControlSignal::Pause
    }

    pub fn is_stop_requested(&self) -> bool {
        self.signal() == ControlSignal::Stop
    }

    pub fn subscribe(&self) -> watch::Receiver<ControlSignal> {
        self.tx.subscribe()
    }

    fn set(&self, signal: ControlSignal) {
        self.tx.send_if_modified(|current| {
            if *current == ControlSignal::Stop || *current == signal {
                return false;
            }
            *current = signal;
            true
        });
    }
}

/// Mutable state of one session, owned by the driver.
#[derive(Debug)]
pub struct RunState {
    /// Last step generated or replayed
    pub step: u64,
    /// Steps actually handed to the oracle
    pub executed: u64,
    pub max_steps: Option<u64>,
    pub chunk_size: u64,
    pub interval: Duration,
    control: PauseControl,
    control_rx: watch::Receiver<ControlSignal>,
    state_tx: watch::Sender<DriverState>,
}

impl RunState {
    pub fn new(settings: &SessionSettings, control: PauseControl) -> Self {
        let (state_tx, _) = watch::channel(DriverState::Idle);
        let control_rx = control.subscribe();
        Self {
            step: 0,
            executed: 0,
            max_steps: settings.max_steps,
            chunk_size: settings.chunk_size,
            interval: settings.interval(),
            control,
            control_rx,
            state_tx,
        }
    }

    pub fn control(&self) -> &PauseControl {
        &self.control
    }

    pub fn state(&self) -> DriverState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<DriverState> {
        self.state_tx.subscribe()
    }

    /// Move to `next` unless already finished.
    pub fn set_state(&self, next: DriverState) {
        self.state_tx.send_if_modified(|current| {
            if *current == DriverState::Finished || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    pub fn is_finished(&self) -> bool {
        self.state() == DriverState::Finished
    }

    /// Whether `step` has reached the step limit.
    pub fn past_limit(&self, step: u64) -> bool {
        self.max_steps.is_some_and(|max| step > max)
    }

    /// Whether `step` is the last step of its chunk.
    pub fn closes_chunk(&self, step: u64) -> bool {
        step % self.chunk_size == 0 || self.max_steps == Some(step)
    }

    /// Block while paused. Returns `false` if a stop was requested.
    pub async fn wait_while_paused(&mut self) -> bool {
        loop {
            let signal = *self.control_rx.borrow_and_update();
            match signal {
                ControlSignal::Run => return true,
                ControlSignal::Stop => return false,
                ControlSignal::Pause => {
                    if self.state() != DriverState::Paused {
                        info!(step = self.step, "Session paused");
                        self.set_state(DriverState::Paused);
                    }
                    if self.control_rx.changed().await.is_err() {
                        return true;
                    }
                    if *self.control_rx.borrow() == ControlSignal::Run {
                        info!(step = self.step, "Session resumed");
                        self.set_state(DriverState::Generating);
                    }
                }
            }
        }
    }

    /// Enter `Finished`. Returns `true` only for the first call.
    pub fn finish(&self) -> bool {
        let first = self.state_tx.send_if_modified(|current| {
            if *current == DriverState::Finished {
                return false;
            }
            *current = DriverState::Finished;
            true
        });
        if first {
            debug!(step = self.step, executed = self.executed, "Run state finished");
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SessionSettings {
        SessionSettings {
            chunk_size: 10,
            max_steps: Some(25),
            ..SessionSettings::default()
        }
    }

    #[test]
    fn test_stop_is_final() {
        let control = PauseControl::new();
        control.pause();
        assert!(control.is_paused());
        control.stop();
        control.resume();
        assert!(control.is_stop_requested());
    }

    #[test]
    fn test_chunk_boundaries() {
        let state = RunState::new(&settings(), PauseControl::new());
        assert!(!state.closes_chunk(9));
        assert!(state.closes_chunk(10));
        assert!(state.closes_chunk(20));
        assert!(state.closes_chunk(25));
        assert!(!state.past_limit(25));
        assert!(state.past_limit(26));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let state = RunState::new(&settings(), PauseControl::new());
        let rx = state.watch_state();
        state.set_state(DriverState::Generating);
        assert!(state.finish());
        assert!(!state.finish());
        state.set_state(DriverState::Generating);
        assert_eq!(*rx.borrow(), DriverState::Finished);
    }

    #[tokio::test]
    async fn test_wait_while_paused() {
        let control = PauseControl::new();
        let mut state = RunState::new(&settings(), control.clone());
        assert!(state.wait_while_paused().await);

        control.pause();
        let mut rx = state.watch_state();
        let waiter = tokio::spawn(async move {
            let resumed = state.wait_while_paused().await;
            (resumed, state)
        });

        rx.wait_for(|s| *s == DriverState::Paused).await.unwrap();
        control.resume();
        let (resumed, state) = waiter.await.unwrap();
        assert!(resumed);
        assert_eq!(state.state(), DriverState::Generating);

        control.stop();
        let mut state = state;
        assert!(!state.wait_while_paused().await);
    }
}
