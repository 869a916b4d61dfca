//! The run driver.
//!
//! One driver runs one session: it generates top-level statements in chunks,
//! hands each to the oracle under a guard timer, and depending on the mode
//! records the steps to a replay log or plays an existing log back.
//!
//! Generation is strictly sequential: step `n` is generated, logged and
//! executed before step `n + 1` is generated, so generation order, step
//! order and log order agree. A checkpoint on step `n` is the PRNG state
//! right after step `n` was generated.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use jsmash_core::{Mt19937, PrngState, DEFAULT_SEED};
use jsmash_grammar::{Bindings, Engine};
use jsmash_history::{LogHeader, ReplayLog, ReplayLogEntry, ReplayLogReader, ReplayLogWriter};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::config::{RunMode, SessionConfig, SessionSettings, StopPolicy};
use crate::error::{DriverError, Result};
use crate::guard::{GuardTimer, Guarded};
use crate::oracle::{ExecutionOutcome, Oracle};
use crate::run_state::{DriverState, PauseControl, RunState};
use crate::scheduler::{ImmediateScheduler, IntervalScheduler, Scheduler};

/// Checkpoint a finding can be regenerated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRef {
    /// Step the checkpoint was taken on
    pub sequence: u64,
    /// PRNG state right after that step
    pub state: PrngState,
}

/// Why a step became a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// The program threw a message matching the stop policy.
    Threw { message: String },
    /// The program timed out.
    TimedOut,
    /// The oracle never returned and the guard timer fired.
    Uncatchable { budget_ms: u64 },
}

/// An interesting step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub step: u64,
    pub text: String,
    pub outcome: FindingKind,
    /// Latest checkpoint at or before `step`
    pub checkpoint: Option<CheckpointRef>,
    pub found_at: DateTime<Utc>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The step limit was reached.
    MaxSteps,
    /// Every logged step was replayed.
    LogExhausted,
    /// A stop was requested through the [`PauseControl`].
    StopRequested,
    /// A finding matched the stop policy.
    Finding,
    /// The guard timer fired.
    GuardFired,
}

/// Summary of a finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub seed: u32,
    /// Session id of the replay log written or read
    pub session_id: Option<Uuid>,
    /// Last step generated or replayed
    pub last_step: u64,
    /// Steps handed to the oracle
    pub executed: u64,
    pub findings: Vec<Finding>,
    pub stopped_by: StopReason,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

enum StepFlow {
    Continue,
    Stop(StopReason),
}

/// Drives one session.
pub struct Driver {
    settings: SessionSettings,
    stop_policy: StopPolicy,
    mode: RunMode,
    active_mode: RunMode,
    seed: u32,
    engine: Engine,
    rng: Mt19937,
    bindings: Bindings,
    oracle: Arc<dyn Oracle>,
    scheduler: Box<dyn Scheduler>,
    guard: GuardTimer,
    run_state: RunState,
    findings: Vec<Finding>,
    last_checkpoint: Option<CheckpointRef>,
    session_id: Option<Uuid>,
}

impl Driver {
    /// Build a driver from a validated configuration.
    pub fn new(config: &SessionConfig, oracle: Arc<dyn Oracle>) -> Result<Self> {
        config.validate()?;
        let engine = Engine::new(config.grammar.clone())?;

        let seed = config.session.seed.unwrap_or_else(|| {
            warn!(seed = DEFAULT_SEED, "No seed configured, using the default seed");
            DEFAULT_SEED
        });

        let scheduler: Box<dyn Scheduler> = if config.session.interval_ms == 0 {
            Box::new(ImmediateScheduler)
        } else {
            Box::new(IntervalScheduler)
        };

        Ok(Self {
            settings: config.session.clone(),
            stop_policy: config.stop.clone(),
            mode: config.session.mode,
            active_mode: config.session.mode,
            seed,
            engine,
            rng: Mt19937::new(seed),
            bindings: Bindings::from_names(config.session.initial_bindings.iter()),
            oracle,
            scheduler,
            guard: GuardTimer::new(config.oracle.guard_grace()),
            run_state: RunState::new(&config.session, PauseControl::new()),
            findings: Vec::new(),
            last_checkpoint: None,
            session_id: None,
        })
    }

    /// Replace the chunk scheduler.
    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    /// Run with a caller-built [`RunState`]; its step limit, chunk size,
    /// interval and pause control take effect. Call before
    /// [`Driver::watch_state`].
    pub fn with_run_state(mut self, run_state: RunState) -> Self {
        self.run_state = run_state;
        self
    }

    /// Handle for pausing, resuming and stopping the session.
    pub fn control(&self) -> PauseControl {
        self.run_state.control().clone()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<DriverState> {
        self.run_state.watch_state()
    }

    pub fn state(&self) -> DriverState {
        self.run_state.state()
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Run the session to completion.
    #[instrument(skip(self), fields(mode = %self.mode, seed = self.seed))]
    pub async fn run(mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            oracle = self.oracle.name(),
            start_depth = self.settings.start_depth,
            chunk_size = self.settings.chunk_size,
            max_steps = ?self.settings.max_steps,
            "Session starting"
        );

        let result = match self.mode {
            RunMode::Immediate => self.generate_loop(None, 1).await,
            RunMode::Record => self.record().await,
            RunMode::Replay => self.replay().await,
        };
        self.shutdown();

        let stopped_by = match result {
            Ok(reason) => reason,
            Err(e) => {
                error!(error = %e, step = self.run_state.step, "Session aborted");
                return Err(e);
            }
        };

        let report = RunReport {
            mode: self.mode,
            seed: self.seed,
            session_id: self.session_id,
            last_step: self.run_state.step,
            executed: self.run_state.executed,
            findings: std::mem::take(&mut self.findings),
            stopped_by,
            started_at,
            elapsed_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            stopped_by = ?report.stopped_by,
            last_step = report.last_step,
            executed = report.executed,
            findings = report.findings.len(),
            elapsed_ms = report.elapsed_ms,
            "Session finished"
        );
        Ok(report)
    }

    /// Enter `Finished`; later calls do nothing.
    fn shutdown(&self) {
        if self.run_state.finish() {
            info!(step = self.run_state.step, "Driver shut down");
        }
    }

    fn log_path(&self) -> Result<PathBuf> {
        self.settings
            .log_path
            .clone()
            .ok_or_else(|| DriverError::missing_log_path(self.mode.to_string()))
    }

    async fn record(&mut self) -> Result<StopReason> {
        let path = self.log_path()?;
        let header = LogHeader::new(self.seed);
        self.session_id = Some(header.session_id);
        let writer = ReplayLogWriter::create(&path, header).await?;
        self.generate_loop(Some(writer), 1).await
    }

    async fn generate_loop(
        &mut self,
        mut writer: Option<ReplayLogWriter>,
        first_step: u64,
    ) -> Result<StopReason> {
        let reason = self.generate_steps(&mut writer, first_step).await;
        if let Some(writer) = writer.as_mut() {
            writer.flush().await?;
        }
        reason
    }

    async fn generate_steps(
        &mut self,
        writer: &mut Option<ReplayLogWriter>,
        first_step: u64,
    ) -> Result<StopReason> {
        let mut step = first_step;
        loop {
            if self.run_state.past_limit(step) {
                return Ok(StopReason::MaxSteps);
            }
            if !self.run_state.wait_while_paused().await {
                return Ok(StopReason::StopRequested);
            }

            let text = self.generate_step()?;
            self.run_state.step = step;
            let checkpoint = self.take_checkpoint(step);
            let chunk_boundary = self.run_state.closes_chunk(step);

            if let Some(writer) = writer.as_mut() {
                let mut entry =
                    ReplayLogEntry::new(step, text.clone()).with_chunk_boundary(chunk_boundary);
                if let Some(state) = checkpoint {
                    entry = entry.with_checkpoint(state);
                }
                writer.append(&entry).await?;
            }

            if let StepFlow::Stop(reason) = self.execute_step(step, &text, None).await? {
                return Ok(reason);
            }

            if chunk_boundary {
                if let Some(writer) = writer.as_mut() {
                    writer.flush().await?;
                }
                self.end_chunk(step, self.run_state.interval).await;
            }
            step += 1;
        }
    }

    async fn replay(&mut self) -> Result<StopReason> {
        let path = self.log_path()?;
        let log = ReplayLogReader::new(&path).read().await?;
        self.seed = log.header().seed;
        self.session_id = Some(log.header().session_id);

        info!(
            path = %path.display(),
            entries = log.len(),
            session_id = %log.header().session_id,
            "Replaying log"
        );

        for entry in log.entries() {
            if self.run_state.past_limit(entry.sequence) {
                return Ok(StopReason::MaxSteps);
            }
            if !self.run_state.wait_while_paused().await {
                return Ok(StopReason::StopRequested);
            }

            self.run_state.step = entry.sequence;
            if let Some(state) = &entry.checkpoint {
                self.last_checkpoint = Some(CheckpointRef {
                    sequence: entry.sequence,
                    state: state.clone(),
                });
            }

            let flow = self
                .execute_step(entry.sequence, &entry.text, entry.timeout_override())
                .await?;
            if let StepFlow::Stop(reason) = flow {
                return Ok(reason);
            }

            if entry.chunk_boundary {
                let interval = entry
                    .interval_override()
                    .unwrap_or(self.run_state.interval);
                self.end_chunk(entry.sequence, interval).await;
            }
        }

        if !self.settings.continue_after_log {
            return Ok(StopReason::LogExhausted);
        }
        self.resume_after(&log, &path).await
    }

    /// Restore the PRNG from the last checkpoint, silently regenerate the
    /// steps logged after it, then keep generating and appending.
    async fn resume_after(&mut self, log: &ReplayLog, path: &Path) -> Result<StopReason> {
        let last = log.last_sequence().unwrap_or(0);
        let (from, rng) = match log.resume_point()? {
            Some(point) => (point.sequence, Mt19937::from_state(&point.state)),
            None => (0, Mt19937::new(log.header().seed)),
        };
        self.rng = rng;

        info!(
            checkpoint = from,
            regenerate = last - from,
            next_step = last + 1,
            "Resuming generation after log"
        );

        let mut logged = log.entries_after(from).iter().peekable();
        for step in from + 1..=last {
            let text = self.generate_step()?;
            self.take_checkpoint(step);
            if let Some(entry) = logged.next_if(|e| e.sequence == step) {
                if entry.text != text {
                    warn!(sequence = step, "Regenerated step differs from the log");
                    return Err(DriverError::ReplayDivergence { sequence: step });
                }
            }
        }
        trace!(regenerated = last - from, "Regenerated steps match the log");

        self.run_state.step = last;
        self.active_mode = RunMode::Record;
        let writer = ReplayLogWriter::open_append(path).await?;
        self.generate_loop(Some(writer), last + 1).await
    }

    fn generate_step(&mut self) -> Result<String> {
        self.run_state.set_state(DriverState::Generating);
        let text =
            self.engine
                .generate_statement(&mut self.rng, self.settings.start_depth, &self.bindings)?;
        Ok(text)
    }

    fn take_checkpoint(&mut self, step: u64) -> Option<PrngState> {
        if step % self.settings.checkpoint_every != 0 {
            return None;
        }
        let state = self.rng.export_state();
        self.last_checkpoint = Some(CheckpointRef {
            sequence: step,
            state: state.clone(),
        });
        debug!(step, "Checkpoint taken");
        Some(state)
    }

    async fn end_chunk(&self, step: u64, interval: Duration) {
        debug!(step, interval_ms = interval.as_millis() as u64, "Chunk complete");
        self.scheduler.between_chunks(interval).await;
    }

    async fn execute_step(
        &mut self,
        step: u64,
        text: &str,
        timeout_override: Option<Duration>,
    ) -> Result<StepFlow> {
        self.run_state
            .set_state(DriverState::Running(self.active_mode));

        let timeout = timeout_override.unwrap_or_else(|| self.oracle.default_timeout());
        let budget = self.guard.budget_for(timeout);
        let oracle = Arc::clone(&self.oracle);
        let program = text.to_owned();
        let task = tokio::spawn(async move { oracle.execute(&program, timeout_override).await });

        let guarded = self.guard.watch(budget, task).await?;
        self.run_state.executed += 1;

        match guarded {
            Guarded::Completed(outcome) => Ok(self.judge(step, text, outcome?)),
            Guarded::Fired { budget } => {
                let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
                self.record_finding(step, text, FindingKind::Uncatchable { budget_ms });
                self.shutdown();
                Ok(StepFlow::Stop(StopReason::GuardFired))
            }
        }
    }

    fn judge(&mut self, step: u64, text: &str, outcome: ExecutionOutcome) -> StepFlow {
        let kind = match outcome {
            ExecutionOutcome::Completed(_) => {
                trace!(step, "Program completed");
                return StepFlow::Continue;
            }
            ExecutionOutcome::Threw(message) => {
                if !self.stop_policy.matches_threw(&message) {
                    debug!(
                        step,
                        error = %first_line(&message),
                        checkpoint = ?self.checkpoint_step(),
                        text,
                        "Program threw"
                    );
                    return StepFlow::Continue;
                }
                FindingKind::Threw { message }
            }
            ExecutionOutcome::TimedOut => {
                if !self.stop_policy.on_timeout {
                    debug!(
                        step,
                        checkpoint = ?self.checkpoint_step(),
                        text,
                        "Program timed out"
                    );
                    return StepFlow::Continue;
                }
                FindingKind::TimedOut
            }
        };

        self.record_finding(step, text, kind);
        if self.stop_policy.stop_on_find {
            StepFlow::Stop(StopReason::Finding)
        } else {
            StepFlow::Continue
        }
    }

    fn checkpoint_step(&self) -> Option<u64> {
        self.last_checkpoint.as_ref().map(|c| c.sequence)
    }

    fn record_finding(&mut self, step: u64, text: &str, outcome: FindingKind) {
        let checkpoint = self.last_checkpoint.clone();
        let checkpoint_step = self.checkpoint_step();

        match &outcome {
            FindingKind::Uncatchable { budget_ms } => error!(
                step,
                budget_ms,
                checkpoint = ?checkpoint_step,
                text,
                "Uncatchable failure: oracle did not return"
            ),
            FindingKind::Threw { message } => warn!(
                step,
                error = %first_line(message),
                checkpoint = ?checkpoint_step,
                text,
                "Finding: program threw"
            ),
            FindingKind::TimedOut => warn!(
                step,
                checkpoint = ?checkpoint_step,
                text,
                "Finding: program timed out"
            ),
        }

        self.findings.push(Finding {
            step,
            text: text.to_string(),
            outcome,
            checkpoint,
            found_at: Utc::now(),
        });
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}
