//! CLI error types and exit codes.

use vpsmon_core::{ConfigError, MonitorError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, serialization, or other non-connection errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection failure - the session could not be established or dropped
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection test failed
    #[error("Connection test failed: {0}")]
    TestFailed(String),

    /// Collection failed for a reason unrelated to connectivity
    #[error("Collection error: {0}")]
    Collection(String),

    /// Async runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Output serialization error
    #[error("Output error: {0}")]
    Output(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<MonitorError> for CliError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Connection(_) | MonitorError::Transport(_) | MonitorError::Timeout { .. } => {
                Self::Connection(err.to_string())
            }
            MonitorError::Collection(_) => Self::Collection(err.to_string()),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, collection, output)
    /// - 2: Connection failure (connect, session drop, timeout, test failed)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Connection(_) | Self::TestFailed(_) => exit_codes::CONNECTION_FAILURE,
            Self::Config(_) | Self::Collection(_) | Self::Runtime(_) | Self::Output(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
