//! Concurrent command execution over one session

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{Instrument, debug, debug_span};

use crate::error::ExecError;
use crate::tracing::span_names;

use super::transport::{CommandResult, RemoteChannel};

/// Runs batches of independent commands concurrently.
///
/// Total latency of a batch is bounded by its slowest command, not the sum.
#[derive(Debug, Clone, Copy)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    /// Creates an executor applying `timeout` to every command
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Per-command timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes `commands` concurrently and returns one result per command,
    /// in input order.
    ///
    /// Every command runs to completion (or timeout) regardless of how its
    /// siblings fare; classifying the batch is left to the caller.
    pub async fn run(
        &self,
        channel: &Arc<dyn RemoteChannel>,
        commands: &[&str],
    ) -> Vec<Result<CommandResult, ExecError>> {
        let span = debug_span!(span_names::SESSION_EXEC, commands = commands.len());
        let started = Instant::now();

        let results = join_all(commands.iter().map(|command| self.run_one(channel, command)))
            .instrument(span)
            .await;

        debug!(
            duration_ms = started.elapsed().as_millis() as u64,
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Command batch finished"
        );
        results
    }

    async fn run_one(
        &self,
        channel: &Arc<dyn RemoteChannel>,
        command: &str,
    ) -> Result<CommandResult, ExecError> {
        match tokio::time::timeout(self.timeout, channel.exec(command)).await {
            Ok(Ok(result)) => {
                if !result.is_success() {
                    debug!(
                        command,
                        exit_status = ?result.exit_status,
                        stderr = %result.stderr.trim(),
                        "Remote command exited with failure"
                    );
                }
                Ok(result)
            }
            Ok(Err(err)) => {
                debug!(command, error = %err, "Remote command failed");
                Err(err)
            }
            Err(_) => Err(ExecError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
