//! Interpreter execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bookwright_core::Invocation;
use tokio::process::Command;
use tracing::debug;

/// What happened when an invocation was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// The process exited on its own.
    Completed {
        /// Exit code, `-1` when the process was killed by a signal.
        exit_code: i32,

        /// Captured stdout.
        stdout: String,

        /// Captured stderr.
        stderr: String,

        /// Duration in milliseconds.
        duration_ms: u64,
    },

    /// The process did not finish within the limit and was killed.
    TimedOut { limit: Duration },
}

/// Runs an interpreter invocation.
///
/// `Err` means the process could not be started at all.
#[async_trait]
pub trait ExampleExecutor: Send + Sync {
    async fn execute(&self, invocation: &Invocation, limit: Duration) -> std::io::Result<Execution>;
}

/// Executes invocations as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl ExampleExecutor for ProcessExecutor {
    async fn execute(&self, invocation: &Invocation, limit: Duration) -> std::io::Result<Execution> {
        let start = Instant::now();
        debug!(command = %invocation, "Spawning interpreter");

        // kill_on_drop reaps the child when the timeout drops the wait future.
        let child = Command::new(&invocation.program)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                debug!(command = %invocation, limit_secs = limit.as_secs(), "Interpreter timed out");
                return Ok(Execution::TimedOut { limit });
            }
        };

        Ok(Execution::Completed {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
