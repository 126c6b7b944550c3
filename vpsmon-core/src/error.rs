//! Error types for vpsmon
//!
//! Each layer has its own error enum: [`ConnectionError`] for session
//! establishment, [`ExecError`] for a single remote command, and
//! [`MonitorError`] for a whole collection cycle. Parsing never fails, so
//! there is no parse error type.

use thiserror::Error;

/// Errors raised while establishing the remote session
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The remote host rejected the supplied credentials
    #[error("Authentication rejected by {host}: {reason}")]
    AuthRejected {
        /// Target host
        host: String,
        /// Message reported by the SSH client
        reason: String,
    },

    /// The host could not be reached (DNS, refused, network down)
    #[error("Host {host} is unreachable: {reason}")]
    Unreachable {
        /// Target host
        host: String,
        /// Message reported by the SSH client
        reason: String,
    },

    /// Session establishment exceeded the configured timeout
    #[error("Connection to {host} timed out after {secs}s")]
    TimedOut {
        /// Target host
        host: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// The local SSH client could not be started
    #[error("Failed to start SSH client: {0}")]
    Spawn(String),

    /// The host configuration is unusable
    #[error("Invalid connection configuration: {0}")]
    Config(String),
}

impl ConnectionError {
    /// Returns true if this failure was caused by a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Errors raised while executing a single remote command
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    /// The command channel failed but the session itself is still alive
    #[error("Channel error: {0}")]
    Channel(String),

    /// The underlying session dropped while the command was running
    #[error("Session lost: {0}")]
    SessionLost(String),

    /// The command did not finish within the configured timeout
    #[error("Command timed out after {secs}s")]
    Timeout {
        /// Timeout that elapsed
        secs: u64,
    },

    /// The local SSH client could not be started for this command
    #[error("Failed to spawn command: {0}")]
    Spawn(String),
}

impl ExecError {
    /// Returns true if the failure invalidates the whole session.
    ///
    /// Session drops and timeouts are transport failures: the batch fails
    /// and the session is marked stale. Channel and spawn errors only
    /// affect the command that raised them.
    #[must_use]
    pub const fn is_session_level(&self) -> bool {
        matches!(self, Self::SessionLost(_) | Self::Timeout { .. })
    }
}

/// Errors returned from a metrics collection cycle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// The session could not be established
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The session dropped mid-batch
    #[error("Transport error: {0}")]
    Transport(String),

    /// A remote operation exceeded its timeout
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// The cycle could not be assembled for a reason unrelated to transport
    #[error("Collection failed: {0}")]
    Collection(String),
}

impl MonitorError {
    /// Returns true for command or connection timeouts
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Connection(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if the failure happened at the transport level
    /// (session drop or timeout), meaning the session was marked stale.
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }

    /// Builds the cycle-level error for a session-level command failure
    #[must_use]
    pub fn from_exec(command: &str, err: &ExecError) -> Self {
        match err {
            ExecError::Timeout { secs } => Self::Timeout {
                operation: format!("Command `{command}`"),
                secs: *secs,
            },
            other => Self::Transport(format!("`{command}`: {other}")),
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected schema
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required value is missing or invalid
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No configuration directory could be determined
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Result type for collection cycles
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
