//! Transport abstraction between the connection manager and SSH
//!
//! [`RemoteTransport`] opens sessions, [`RemoteChannel`] runs commands over
//! an open session. The production implementation lives in
//! [`super::ssh`]; tests plug in scripted transports.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::HostConfig;
use crate::error::{ConnectionError, ExecError};

/// Output of one remote command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    /// Exit status, `None` if the remote side did not report one
    pub exit_status: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandResult {
    /// Creates a successful result with the given stdout
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed result with the given exit status and stderr
    #[must_use]
    pub fn failure(exit_status: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_status: Some(exit_status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with status 0
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.exit_status, Some(0))
    }
}

/// An established remote session that can run commands.
///
/// Implementations must allow concurrent `exec` calls; each call is an
/// independent channel with no shared shell state.
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Runs one command and collects its output
    async fn exec(&self, command: &str) -> Result<CommandResult, ExecError>;

    /// Tears the session down. Further `exec` calls fail.
    async fn close(&self);
}

/// Factory for remote sessions
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Opens a session to the configured host.
    ///
    /// The caller enforces the connect timeout; implementations should
    /// still pass it down to the underlying client where possible.
    async fn connect(&self, config: &HostConfig)
    -> Result<Arc<dyn RemoteChannel>, ConnectionError>;
}
