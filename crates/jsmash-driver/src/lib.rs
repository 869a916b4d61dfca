//! # jsmash-driver
//!
//! Session driver for jsmash: feeds generated programs to an oracle in
//! chunks, records and replays sessions, and reduces interesting logs.
//!
//! ## Architecture
//!
//! - **Config**: TOML session configuration with validated sections
//! - **Run state**: Step counter, state machine and the [`PauseControl`] handle
//! - **Oracle**: The [`Oracle`] seam with process, null and blocking implementations
//! - **Guard**: Deadline around every oracle call
//! - **Scheduler**: How the driver yields between chunks
//! - **Driver**: Immediate, record and replay modes, with resume after a replay
//! - **Reduce**: Delta debugging over replay log entries
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jsmash_driver::{Driver, NullOracle, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = SessionConfig::default();
//!     config.session.seed = Some(5489);
//!     config.session.max_steps = Some(1_000);
//!
//!     let report = Driver::new(&config, Arc::new(NullOracle::default()))?
//!         .run()
//!         .await?;
//!     println!("{} steps, {} findings", report.executed, report.findings.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod guard;
pub mod oracle;
pub mod reduce;
pub mod run_state;
pub mod scheduler;

pub use config::{LoggingConfig, OracleConfig, RunMode, SessionConfig, SessionSettings, StopPolicy};
pub use driver::{CheckpointRef, Driver, Finding, FindingKind, RunReport, StopReason};
pub use error::{DriverError, OracleError, ReduceError, Result};
pub use guard::{GuardTimer, Guarded};
pub use oracle::{BlockingOracle, ExecutionOutcome, NullOracle, Oracle, ProcessOracle};
pub use reduce::{reduce_log, ReduceConfig, Reducer, Reduction, ReductionStats};
pub use run_state::{ControlSignal, DriverState, PauseControl, RunState};
pub use scheduler::{ImmediateScheduler, IntervalScheduler, Scheduler};
