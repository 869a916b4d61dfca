use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::{ExecutionOutcome, Oracle};
use crate::error::OracleError;

/// Runs each program in a fresh runtime process.
///
/// The program text is written to the process's stdin, which is then
/// closed. Exit status zero is [`ExecutionOutcome::Completed`] with the
/// captured stdout; a non-zero status or a signal is
/// [`ExecutionOutcome::Threw`] with the captured stderr. A process that
/// outlives its timeout is killed.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessOracle {
    /// `command[0]` is the program, the rest its arguments.
    pub fn new(command: Vec<String>) -> Result<Self, OracleError> {
        let mut parts = command.into_iter();
        let program = parts.next().ok_or(OracleError::EmptyCommand)?;
        if program.is_empty() {
            return Err(OracleError::EmptyCommand);
        }
        Ok(Self {
            program,
            args: parts.collect(),
            timeout: Duration::from_secs(5),
        })
    }

    /// Set the timeout duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Oracle for ProcessOracle {
    fn name(&self) -> &str {
        &self.program
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
        let mut child = self
            .build_command()
            .spawn()
            .map_err(|e| OracleError::spawn(&self.program, e.to_string()))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let input = text.as_bytes().to_vec();
        let stdin_handle = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                // The runtime may exit before reading everything.
                if let Err(e) = stdin.write_all(&input).await {
                    trace!(error = %e, "Runtime closed stdin early");
                }
            }
        });
        let stdout_handle = tokio::spawn(read_to_string(stdout));
        let stderr_handle = tokio::spawn(read_to_string(stderr));

        let status = match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(OracleError::Io(e)),
            Err(_) => {
                debug!(program = %self.program, timeout = ?limit, "Runtime timed out");
                if let Err(e) = child.kill().await {
                    warn!(program = %self.program, error = %e, "Failed to kill runtime");
                }
                stdin_handle.abort();
                stdout_handle.abort();
                stderr_handle.abort();
                return Ok(ExecutionOutcome::TimedOut);
            }
        };

        if let Err(e) = stdin_handle.await {
            debug!(program = %self.program, error = %e, "Stdin writer task failed");
        }
        let stdout = join_output(stdout_handle.await, "stdout");
        let stderr = join_output(stderr_handle.await, "stderr");

        if status.success() {
            return Ok(ExecutionOutcome::Completed(stdout));
        }

        let message = if stderr.trim().is_empty() {
            describe_failure(status)
        } else {
            stderr
        };
        Ok(ExecutionOutcome::Threw(message))
    }
}

/// Read a captured stream to the end. Output read before an error is kept.
async fn read_to_string<R>(source: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut source) = source {
        if let Err(e) = source.read_to_end(&mut buf).await {
            debug!(error = %e, read = buf.len(), "Failed to read runtime output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn join_output(joined: Result<String, tokio::task::JoinError>, stream: &'static str) -> String {
    joined.unwrap_or_else(|e| {
        debug!(stream, error = %e, "Output reader task failed");
        String::new()
    })
}

fn describe_failure(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {signal}");
        }
    }
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "exited abnormally".to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn oracle(command: &[&str]) -> ProcessOracle {
        ProcessOracle::new(command.iter().map(|s| s.to_string()).collect())
            .unwrap()
            .with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(
            ProcessOracle::new(Vec::new()),
            Err(OracleError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_completed_echoes_stdout() {
        let outcome = oracle(&["cat"]).execute("x = 1;\n", None).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed("x = 1;\n".to_string()));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_threw() {
        let outcome = oracle(&["sh", "-c", "cat >/dev/null; echo 'Assertion failure' >&2; exit 3"])
            .execute("f();", None)
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Threw("Assertion failure\n".to_string()));

        let outcome = oracle(&["sh", "-c", "exit 4"]).execute("", None).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Threw("exited with status 4".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_kills_runtime() {
        let outcome = oracle(&["sleep", "5"])
            .execute("", Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
    }

    struct BrokenPipe {
        sent: bool,
    }

    impl tokio::io::AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.sent {
                let err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
                return std::task::Poll::Ready(Err(err));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_error_keeps_partial_output() {
        let output = read_to_string(Some(BrokenPipe { sent: false })).await;
        assert_eq!(output, "partial");
        assert_eq!(read_to_string(None::<BrokenPipe>).await, "");
    }

    #[tokio::test]
    async fn test_failed_reader_task_yields_empty_output() {
        let handle = tokio::spawn(std::future::pending::<String>());
        handle.abort();
        assert_eq!(join_output(handle.await, "stdout"), "");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = oracle(&["/nonexistent/jsmash-runtime"])
            .execute("", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Spawn { .. }));
    }
}
