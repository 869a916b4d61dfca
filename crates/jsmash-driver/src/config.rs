//! Session configuration.
//!
//! A session is configured from a TOML file whose sections all default, so
//! an empty file is a valid configuration. The binary merges its command
//! line arguments on top before calling [`SessionConfig::validate`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jsmash_grammar::GrammarOptions;
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, Result};

/// Complete session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Run loop settings.
    pub session: SessionSettings,

    /// Grammar engine probabilities.
    pub grammar: GrammarOptions,

    /// How generated programs are executed.
    pub oracle: OracleConfig,

    /// Which outcomes count as findings.
    pub stop: StopPolicy,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How the driver produces programs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Generate and execute, keep nothing.
    #[default]
    Immediate,
    /// Generate, execute and append every step to the replay log.
    Record,
    /// Execute the steps of an existing replay log.
    Replay,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Immediate => write!(f, "immediate"),
            RunMode::Record => write!(f, "record"),
            RunMode::Replay => write!(f, "replay"),
        }
    }
}

/// Run loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// PRNG seed. Drawn at random by the CLI when unset.
    pub seed: Option<u32>,

    /// Run mode.
    pub mode: RunMode,

    /// Steps per chunk.
    pub chunk_size: u64,

    /// Pause between chunks in milliseconds.
    pub interval_ms: u64,

    /// Stop after this many steps; unbounded when unset.
    pub max_steps: Option<u64>,

    /// Store a PRNG checkpoint every this many steps.
    pub checkpoint_every: u64,

    /// Depth budget of each top-level statement.
    pub start_depth: i32,

    /// Identifiers in scope for every top-level statement.
    pub initial_bindings: Vec<String>,

    /// Replay log to write (record) or read (replay).
    pub log_path: Option<PathBuf>,

    /// In replay mode, keep generating after the log is exhausted.
    pub continue_after_log: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            seed: None,
            mode: RunMode::Immediate,
            chunk_size: 100,
            interval_ms: 10,
            max_steps: None,
            checkpoint_every: 100,
            start_depth: 10,
            initial_bindings: Vec::new(),
            log_path: None,
            continue_after_log: false,
        }
    }
}

impl SessionSettings {
    /// Returns the chunk interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Oracle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Runtime command and arguments; the program is written to its stdin.
    /// An empty command selects the null oracle.
    pub command: Vec<String>,

    /// Per-program timeout in milliseconds.
    pub timeout_ms: u64,

    /// Extra time the guard timer allows beyond the timeout.
    pub guard_grace_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_ms: 5_000,
            guard_grace_ms: 2_000,
        }
    }
}

impl OracleConfig {
    /// Returns the per-program timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the guard grace period as a Duration.
    pub fn guard_grace(&self) -> Duration {
        Duration::from_millis(self.guard_grace_ms)
    }
}

/// Which oracle outcomes become findings, and whether a finding ends the
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopPolicy {
    /// A timeout is a finding.
    pub on_timeout: bool,

    /// A thrown error whose message contains one of these is a finding.
    pub threw_substrings: Vec<String>,

    /// Stop the session at the first finding.
    pub stop_on_find: bool,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            on_timeout: true,
            threw_substrings: vec![
                "Assertion failure".to_string(),
                "internal error".to_string(),
            ],
            stop_on_find: true,
        }
    }
}

impl StopPolicy {
    /// Whether a thrown message is a finding.
    pub fn matches_threw(&self, message: &str) -> bool {
        self.threw_substrings
            .iter()
            .any(|needle| message.contains(needle.as_str()))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (pretty, json, compact).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl SessionConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            DriverError::Configuration(reason) => {
                DriverError::configuration(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DriverError::configuration(e.to_string()))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DriverError::configuration(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.grammar
            .validate()
            .map_err(|e| DriverError::configuration(e.to_string()))?;

        let session = &self.session;
        if session.chunk_size == 0 {
            return Err(DriverError::configuration("chunk_size must be positive"));
        }
        if session.checkpoint_every == 0 {
            return Err(DriverError::configuration(
                "checkpoint_every must be positive",
            ));
        }
        if session.start_depth < 0 {
            return Err(DriverError::configuration(format!(
                "start_depth must not be negative, got {}",
                session.start_depth
            )));
        }
        if session.mode != RunMode::Immediate && session.log_path.is_none() {
            return Err(DriverError::missing_log_path(session.mode.to_string()));
        }
        if session.continue_after_log && session.mode != RunMode::Replay {
            return Err(DriverError::configuration(
                "continue_after_log only applies to replay mode",
            ));
        }

        if self.oracle.timeout_ms == 0 {
            return Err(DriverError::configuration("oracle timeout must be positive"));
        }
        if self.oracle.command.first().is_some_and(|c| c.is_empty()) {
            return Err(DriverError::configuration("oracle program name is empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DriverError::configuration(format!(
                "invalid log level: {}",
                self.logging.level
            )));
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(DriverError::configuration(format!(
                "invalid log format: {}",
                self.logging.format
            )));
        }

        Ok(())
    }
}
