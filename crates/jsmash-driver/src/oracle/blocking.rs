use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{ExecutionOutcome, Oracle};
use crate::error::OracleError;

type BlockingFn = dyn Fn(&str) -> ExecutionOutcome + Send + Sync;

/// Runs a synchronous check on the blocking thread pool.
///
/// A closure that overruns its timeout is abandoned, not interrupted: its
/// thread keeps running until the closure returns.
#[derive(Clone)]
pub struct BlockingOracle {
    name: String,
    timeout: Duration,
    check: Arc<BlockingFn>,
}

impl BlockingOracle {
    pub fn new<F>(name: impl Into<String>, timeout: Duration, check: F) -> Self
    where
        F: Fn(&str) -> ExecutionOutcome + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            timeout,
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for BlockingOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingOracle")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Oracle for BlockingOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(
        &self,
        text: &str,
        timeout_override: Option<Duration>,
    ) -> Result<ExecutionOutcome, OracleError> {
        let limit = timeout_override.unwrap_or(self.timeout);
        let check = Arc::clone(&self.check);
        let text = text.to_owned();
        let handle = tokio::task::spawn_blocking(move || check(&text));

        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(OracleError::worker(e.to_string())),
            Err(_) => {
                warn!(oracle = %self.name, timeout = ?limit, "Blocking check abandoned");
                Ok(ExecutionOutcome::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocking_outcomes() {
        let oracle = BlockingOracle::new("len", Duration::from_secs(1), |text| {
            if text.contains("throw") {
                ExecutionOutcome::Threw("Error: thrown".to_string())
            } else {
                ExecutionOutcome::Completed(text.len().to_string())
            }
        });

        assert_eq!(
            oracle.execute("abc", None).await.unwrap(),
            ExecutionOutcome::Completed("3".to_string())
        );
        assert!(oracle.execute("throw 1;", None).await.unwrap().is_threw());
    }

    #[tokio::test]
    async fn test_blocking_timeout_override() {
        let oracle = BlockingOracle::new("slow", Duration::from_secs(10), |_| {
            std::thread::sleep(Duration::from_millis(300));
            ExecutionOutcome::Completed(String::new())
        });

        let outcome = oracle
            .execute("x", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_blocking_panic_is_error() {
        let oracle = BlockingOracle::new("panics", Duration::from_secs(1), |_| panic!("bad check"));
        assert!(matches!(
            oracle.execute("x", None).await,
            Err(OracleError::Worker(_))
        ));
    }
}
