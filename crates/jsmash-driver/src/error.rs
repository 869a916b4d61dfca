//! Error types for the driver crate.

use std::time::Duration;

use jsmash_grammar::GrammarError;
use jsmash_history::HistoryError;
use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors that abort a session.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Generation hit a contract violation.
    #[error("generation failed: {0}")]
    Grammar(#[from] GrammarError),

    /// Reading or writing the replay log failed.
    #[error("replay log error: {0}")]
    History(#[from] HistoryError),

    /// The oracle could not run the program at all.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A mode needs a replay log path but none was configured.
    #[error("{mode} mode requires a replay log path")]
    MissingLogPath {
        /// The mode that was requested.
        mode: String,
    },

    /// Regeneration after a checkpoint produced different text than the log.
    #[error("regenerated step {sequence} does not match the replay log")]
    ReplayDivergence {
        /// The first sequence that differs.
        sequence: u64,
    },

    /// The task running the oracle panicked or was cancelled.
    #[error("oracle task failed: {0}")]
    OracleTask(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Creates a missing log path error.
    pub fn missing_log_path(mode: impl Into<String>) -> Self {
        Self::MissingLogPath { mode: mode.into() }
    }

    /// Creates an oracle task error.
    pub fn oracle_task(reason: impl Into<String>) -> Self {
        Self::OracleTask(reason.into())
    }

    /// Whether the error came from the grammar engine.
    pub fn is_generation_error(&self) -> bool {
        matches!(self, Self::Grammar(_))
    }
}

/// Errors raised by an oracle that prevent it from producing an outcome.
///
/// A program that throws or hangs is not an error: it is reported through
/// [`crate::ExecutionOutcome`].
#[derive(Debug, Error)]
pub enum OracleError {
    /// No runtime command is configured.
    #[error("oracle command is empty")]
    EmptyCommand,

    /// The runtime could not be started.
    #[error("failed to spawn {command}: {reason}")]
    Spawn {
        /// The program that failed to start.
        command: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The blocking worker failed.
    #[error("oracle worker failed: {0}")]
    Worker(String),

    /// I/O error while talking to the runtime.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OracleError {
    /// Creates a spawn error.
    pub fn spawn(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Spawn {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a worker error.
    pub fn worker(reason: impl Into<String>) -> Self {
        Self::Worker(reason.into())
    }
}

/// Errors raised by log reduction.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// There is nothing to reduce.
    #[error("cannot reduce an empty replay log")]
    EmptyLog,

    /// The full log does not produce an interesting outcome.
    #[error("replay log is not interesting - nothing to reduce")]
    NotInteresting,

    /// The reduced log stopped being interesting on the final check.
    #[error("reduced log is no longer interesting")]
    LostInterest,

    /// Maximum iterations reached without convergence.
    #[error("maximum iterations ({0}) reached without convergence")]
    MaxIterationsReached(usize),

    /// Reduction ran out of time.
    #[error("reduction timed out after {0:?}")]
    Timeout(Duration),

    /// The oracle failed while checking a candidate.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
}

/// Result type for reduction.
pub type ReduceResult<T> = std::result::Result<T, ReduceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriverError::configuration("chunk_size must be positive");
        assert_eq!(
            err.to_string(),
            "configuration error: chunk_size must be positive"
        );

        let err = DriverError::missing_log_path("replay");
        assert_eq!(err.to_string(), "replay mode requires a replay log path");

        let err = DriverError::ReplayDivergence { sequence: 31 };
        assert_eq!(
            err.to_string(),
            "regenerated step 31 does not match the replay log"
        );

        let err = OracleError::spawn("d8", "not found");
        assert_eq!(err.to_string(), "failed to spawn d8: not found");
    }

    #[test]
    fn test_error_conversion() {
        let err: DriverError = GrammarError::EmptyRegistry.into();
        assert!(err.is_generation_error());

        let err: DriverError = OracleError::EmptyCommand.into();
        assert!(!err.is_generation_error());
        assert!(err.to_string().contains("oracle command is empty"));

        let err: ReduceError = OracleError::worker("panicked").into();
        assert!(matches!(err, ReduceError::Oracle(_)));
    }
}
