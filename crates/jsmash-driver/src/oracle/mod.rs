//! Oracle interface: runs one generated program and reports what happened.
//!
//! Implementations:
//! - [`ProcessOracle`]: Pipes the program into an external runtime process
//! - [`NullOracle`]: Accepts everything, for generation-only sessions
//! - [`BlockingOracle`]: Adapts a synchronous closure

mod blocking;
mod null;
mod process;

pub use blocking::BlockingOracle;
pub use null::NullOracle;
pub use process::ProcessOracle;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OracleConfig;
use crate::error::OracleError;

/// What happened when a program ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Ran to completion; carries the runtime's output.
    Completed(String),
    /// Threw or exited abnormally; carries the error message.
    Threw(String),
    /// Did not finish within its timeout.
    TimedOut,
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_threw(&self) -> bool {
        matches!(self, Self::Threw(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Executes generated programs.
///
/// An oracle must enforce its own timeout and report [`ExecutionOutcome::TimedOut`].
/// The driver additionally races every call against a guard timer of
/// `timeout + grace`, so an oracle that never returns costs one step and
/// ends the session instead of hanging it.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Timeout used when a step carries no override.
    fn default_timeout(&self) -> Duration;

    /// Run `text`, honoring `timeout_override` when given.
    async fn execute(
        &self,
        text: &str,
        timeout_override: Option<Duration>,
    ) -> Result<ExecutionOutcome, OracleError>;
}

/// Build the oracle described by `config`.
///
/// An empty command selects the [`NullOracle`].
pub fn from_config(config: &OracleConfig) -> Result<Arc<dyn Oracle>, OracleError> {
    if config.command.is_empty() {
        return Ok(Arc::new(NullOracle::new(config.timeout())));
    }
    let oracle = ProcessOracle::new(config.command.clone())?.with_timeout(config.timeout());
    Ok(Arc::new(oracle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&ExecutionOutcome::Threw("boom".into())).unwrap();
        assert_eq!(json, r#"{"kind":"threw","detail":"boom"}"#);

        let json = serde_json::to_string(&ExecutionOutcome::TimedOut).unwrap();
        assert_eq!(json, r#"{"kind":"timed_out"}"#);
    }

    #[test]
    fn test_from_config() {
        let oracle = from_config(&OracleConfig::default()).unwrap();
        assert_eq!(oracle.name(), "null");

        let config = OracleConfig {
            command: vec!["d8".to_string()],
            timeout_ms: 300,
            ..OracleConfig::default()
        };
        let oracle = from_config(&config).unwrap();
        assert_eq!(oracle.name(), "d8");
        assert_eq!(oracle.default_timeout(), Duration::from_millis(300));
    }
}
