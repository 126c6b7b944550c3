//! Session state machine values

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{AuthMethod, HostConfig};

/// Connection state of the remote session
///
/// ```text
/// Disconnected ──connect──▶ Connecting ──ok──▶ Connected
///      ▲                        │                  │
///      │                      error          transport failure
///      │                        ▼                  │
///      └──────connect────── Failed    Disconnected ◀┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session; the next request connects lazily
    #[default]
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// The session is usable
    Connected,
    /// The last connection attempt failed
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Identity and state of the one remote session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSession {
    /// Target host address
    pub host: String,
    /// Target port
    pub port: u16,
    /// Login name
    pub username: String,
    /// How the session authenticates (never the secret itself)
    #[serde(skip)]
    pub auth: AuthMethod,
    /// Current state
    pub state: SessionState,
    /// Reason of the last connect or transport failure
    pub last_failure: Option<String>,
    /// Incremented on every successful connect
    pub generation: u64,
    /// When the current session was established
    pub connected_at: Option<DateTime<Utc>>,
}

impl RemoteSession {
    /// Creates a disconnected session record for `config`
    #[must_use]
    pub fn new(config: &HostConfig) -> Self {
        Self {
            host: config.address.clone(),
            port: config.port,
            username: config.username.clone(),
            auth: config.auth_method(),
            state: SessionState::Disconnected,
            last_failure: None,
            generation: 0,
            connected_at: None,
        }
    }

    /// Connecting → Connected
    pub fn mark_connected(&mut self) {
        self.state = SessionState::Connected;
        self.generation += 1;
        self.connected_at = Some(Utc::now());
        self.last_failure = None;
    }

    /// Connecting → Failed
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.state = SessionState::Failed;
        self.connected_at = None;
        self.last_failure = Some(reason.into());
    }

    /// Connected → Disconnected
    pub fn mark_disconnected(&mut self, reason: Option<String>) {
        self.state = SessionState::Disconnected;
        self.connected_at = None;
        if reason.is_some() {
            self.last_failure = reason;
        }
    }
}
