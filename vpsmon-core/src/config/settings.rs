//! Settings sections of the vpsmon configuration file
//!
//! `[host]` describes the monitored machine and how to reach it,
//! `[monitoring]` controls cadence and display caps, `[logging]` feeds
//! [`crate::tracing::TracingConfig`].

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::tracing::{TracingConfig, TracingLevel, TracingOutput};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default session establishment timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;

/// Default keep-alive interval (seconds)
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 10;

/// Default per-command timeout (seconds)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 15;

/// Default polling interval of the distribution loop (seconds)
pub const DEFAULT_INTERVAL_SECS: u8 = 2;

/// Default number of cores shown by dashboards
pub const DEFAULT_MAX_CORES_DISPLAY: u32 = 4;

/// Default length of the process table
pub const DEFAULT_PROCESS_LIMIT: usize = 10;

/// Connection parameters for the monitored host (`[host]`)
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Hostname or IP address
    pub address: String,
    /// SSH port
    pub port: u16,
    /// Remote login name
    pub username: String,
    /// Password for password authentication
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    /// Private key for public-key authentication (`~` is expanded)
    pub identity_file: Option<PathBuf>,
    /// Session establishment timeout in seconds
    pub connect_timeout_secs: u64,
    /// Interval between keep-alive messages, in seconds
    pub keepalive_interval_secs: u64,
    /// Timeout for each remote command in seconds
    pub command_timeout_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: DEFAULT_SSH_PORT,
            username: String::new(),
            password: None,
            identity_file: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            keepalive_interval_secs: DEFAULT_KEEPALIVE_INTERVAL_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

/// How the session authenticates against the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Password supplied through `sshpass`
    Password,
    /// Explicit private key file
    KeyFile,
    /// Whatever the local SSH agent / default keys provide
    Agent,
}

impl HostConfig {
    /// Creates a configuration for `username@address` with default timeouts
    #[must_use]
    pub fn new(address: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// Sets the password used for authentication
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Sets the private key used for authentication
    #[must_use]
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Sets the SSH port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the session establishment timeout
    #[must_use]
    pub const fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Sets the per-command timeout
    #[must_use]
    pub const fn with_command_timeout_secs(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    /// Returns the authentication method implied by the configured credentials.
    ///
    /// A password wins over a key file, matching how `sshpass` is layered
    /// on top of the ssh client.
    #[must_use]
    pub const fn auth_method(&self) -> AuthMethod {
        if self.password.is_some() {
            AuthMethod::Password
        } else if self.identity_file.is_some() {
            AuthMethod::KeyFile
        } else {
            AuthMethod::Agent
        }
    }

    /// `user@host` destination string
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.address)
    }

    /// Session establishment timeout (at least one second)
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    /// Per-command timeout (at least one second)
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }

    /// Returns the key path with `~` and environment variables expanded
    #[must_use]
    pub fn expanded_identity_file(&self) -> Option<PathBuf> {
        self.identity_file.as_ref().map(|path| {
            let raw = path.to_string_lossy();
            shellexpand::full(&raw)
                .map(|expanded| PathBuf::from(expanded.into_owned()))
                .unwrap_or_else(|_| path.clone())
        })
    }

    /// Checks that the values needed to open a session are present
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.address.trim().is_empty() {
            return Err("host address is empty".to_string());
        }
        if self.username.trim().is_empty() {
            return Err("username is empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be non-zero".to_string());
        }
        Ok(())
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

/// Collection cadence and display caps (`[monitoring]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Polling interval in seconds (1–60, default: 2)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u8,
    /// Maximum number of cores a dashboard should display
    #[serde(default = "default_max_cores_display")]
    pub max_cores_display: u32,
    /// Number of processes requested from the remote `ps`
    #[serde(default = "default_process_limit")]
    pub process_limit: usize,
    /// Validity window of the shared snapshot cache in milliseconds (0 = off)
    #[serde(default)]
    pub cache_ttl_ms: u64,
}

const fn default_interval_secs() -> u8 {
    DEFAULT_INTERVAL_SECS
}

const fn default_max_cores_display() -> u32 {
    DEFAULT_MAX_CORES_DISPLAY
}

const fn default_process_limit() -> usize {
    DEFAULT_PROCESS_LIMIT
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_cores_display: default_max_cores_display(),
            process_limit: default_process_limit(),
            cache_ttl_ms: 0,
        }
    }
}

impl MonitoringSettings {
    /// Returns the interval clamped to the valid range (1–60 seconds)
    #[must_use]
    pub const fn effective_interval_secs(&self) -> u8 {
        if self.interval_secs == 0 {
            1
        } else if self.interval_secs > 60 {
            60
        } else {
            self.interval_secs
        }
    }

    /// Polling interval as a [`Duration`]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.effective_interval_secs()))
    }

    /// Process table length, never zero
    #[must_use]
    pub fn effective_process_limit(&self) -> usize {
        self.process_limit.max(1)
    }

    /// Snapshot cache TTL, `None` when caching is disabled
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_ms > 0).then(|| Duration::from_millis(self.cache_ttl_ms))
    }
}

/// Logging section (`[logging]`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level name (error, warn, info, debug, trace)
    #[serde(default)]
    pub level: Option<String>,
    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Raw `EnvFilter` directive, overrides `level`
    #[serde(default)]
    pub filter: Option<String>,
}

impl LoggingSettings {
    /// Builds the tracing configuration described by this section
    #[must_use]
    pub fn to_tracing_config(&self) -> TracingConfig {
        let level = self
            .level
            .as_deref()
            .and_then(|l| l.parse::<TracingLevel>().ok())
            .unwrap_or_default();
        let mut config = TracingConfig::new().with_level(level);
        if let Some(ref path) = self.file {
            config = config.with_output(TracingOutput::File { path: path.clone() });
        }
        if let Some(ref filter) = self.filter {
            config = config.with_filter(filter.clone());
        }
        config
    }
}
