//! Connection manager for the remote session
//!
//! Owns the [`RemoteSession`] state machine and the live channel. The
//! session is established lazily by [`ConnectionManager::ensure_connected`]
//! and torn down when a caller reports a transport failure through
//! [`ConnectionManager::mark_stale`]. There is no background reconnection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::HostConfig;
use crate::error::{ConnectionError, ExecError};
use crate::tracing::span_names;

use super::state::{RemoteSession, SessionState};
use super::transport::{RemoteChannel, RemoteTransport};

/// Command used by [`ConnectionManager::test_connection`]
pub const CONNECTION_TEST_COMMAND: &str = "echo \"Connection test successful\"";

type ConnectFuture = Shared<BoxFuture<'static, Result<ActiveSession, ConnectionError>>>;

/// A usable session handed out by the manager
#[derive(Clone)]
pub struct ActiveSession {
    /// Channel factory for this session
    pub channel: Arc<dyn RemoteChannel>,
    /// Generation of the session, passed back to [`ConnectionManager::mark_stale`]
    pub generation: u64,
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

struct Slot {
    session: RemoteSession,
    channel: Option<Arc<dyn RemoteChannel>>,
    pending: Option<ConnectFuture>,
}

/// Owns the session to one host
pub struct ConnectionManager {
    config: Arc<HostConfig>,
    transport: Arc<dyn RemoteTransport>,
    slot: Arc<Mutex<Slot>>,
    connect_attempts: Arc<AtomicU64>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("host", &self.config.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionManager {
    /// Creates a manager in the `Disconnected` state
    #[must_use]
    pub fn new(config: HostConfig, transport: Arc<dyn RemoteTransport>) -> Self {
        let session = RemoteSession::new(&config);
        Self {
            config: Arc::new(config),
            transport,
            slot: Arc::new(Mutex::new(Slot {
                session,
                channel: None,
                pending: None,
            })),
            connect_attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Host configuration this manager connects with
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.slot).session.state
    }

    /// Snapshot of the session record
    #[must_use]
    pub fn session(&self) -> RemoteSession {
        lock(&self.slot).session.clone()
    }

    /// Reason of the last failure, if any
    #[must_use]
    pub fn last_failure(&self) -> Option<String> {
        lock(&self.slot).session.last_failure.clone()
    }

    /// Number of underlying connection attempts made so far
    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Returns the live session, connecting first if needed.
    ///
    /// Idempotent while connected. Concurrent callers during `Connecting`
    /// all await the same attempt, so only one session is ever opened.
    ///
    /// # Errors
    ///
    /// Returns the [`ConnectionError`] of the attempt; the state becomes
    /// `Failed` and the next call tries again.
    pub async fn ensure_connected(&self) -> Result<ActiveSession, ConnectionError> {
        let attempt = {
            let mut slot = lock(&self.slot);
            if slot.session.state == SessionState::Connected
                && let Some(ref channel) = slot.channel
            {
                return Ok(ActiveSession {
                    channel: Arc::clone(channel),
                    generation: slot.session.generation,
                });
            }

            if let Some(ref pending) = slot.pending {
                debug!("Joining in-flight connection attempt");
                pending.clone()
            } else {
                slot.session.state = SessionState::Connecting;
                let attempt = self.start_attempt();
                slot.pending = Some(attempt.clone());
                attempt
            }
        };

        attempt.await
    }

    /// Builds the shared connect future. It applies its own state transition
    /// so the outcome is recorded even if the caller that started it is gone.
    fn start_attempt(&self) -> ConnectFuture {
        let config = Arc::clone(&self.config);
        let transport = Arc::clone(&self.transport);
        let slot = Arc::clone(&self.slot);
        let attempts = Arc::clone(&self.connect_attempts);

        let span = info_span!(
            span_names::SESSION_CONNECT,
            host = %config.address,
            port = config.port,
        );

        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            debug!(username = %config.username, "Opening remote session");

            let timeout = config.connect_timeout();
            let result = match tokio::time::timeout(timeout, transport.connect(&config)).await {
                Ok(result) => result,
                Err(_) => Err(ConnectionError::TimedOut {
                    host: config.address.clone(),
                    secs: timeout.as_secs(),
                }),
            };

            let mut slot = lock(&slot);
            slot.pending = None;
            match result {
                Ok(channel) => {
                    slot.session.mark_connected();
                    slot.channel = Some(Arc::clone(&channel));
                    info!(generation = slot.session.generation, "Connected to remote host");
                    Ok(ActiveSession {
                        channel,
                        generation: slot.session.generation,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "Connection attempt failed");
                    slot.session.mark_failed(err.to_string());
                    slot.channel = None;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .boxed()
        .shared()
    }

    /// Marks the session of `generation` stale after a transport failure.
    ///
    /// Reports for an older generation are ignored so a late failure from a
    /// previous session cannot tear down a newer one.
    pub async fn mark_stale(&self, generation: u64, reason: impl Into<String>) {
        let reason = reason.into();
        let channel = {
            let mut slot = lock(&self.slot);
            if slot.session.state != SessionState::Connected
                || slot.session.generation != generation
            {
                debug!(
                    generation,
                    current = slot.session.generation,
                    "Ignoring stale report for an old session"
                );
                return;
            }
            warn!(generation, reason = %reason, "Session marked stale");
            slot.session.mark_disconnected(Some(reason));
            slot.channel.take()
        };

        if let Some(channel) = channel {
            channel.close().await;
        }
    }

    /// Closes the session if one is open
    pub async fn disconnect(&self) {
        let channel = {
            let mut slot = lock(&self.slot);
            if slot.session.state == SessionState::Connected {
                slot.session.mark_disconnected(None);
            }
            slot.channel.take()
        };

        if let Some(channel) = channel {
            let span = info_span!(span_names::SESSION_DISCONNECT, host = %self.config.address);
            channel.close().instrument(span).await;
            info!(host = %self.config.address, "Disconnected from remote host");
        }
    }

    /// Connects if needed and runs a trivial command as a round-trip check.
    ///
    /// # Errors
    ///
    /// Returns the connection error, or the execution error of the test
    /// command. Session-level failures mark the session stale.
    pub async fn test_connection(&self) -> Result<String, ConnectionTestError> {
        let active = self.ensure_connected().await?;
        match active.channel.exec(CONNECTION_TEST_COMMAND).await {
            Ok(result) if result.is_success() => Ok(result.stdout.trim().to_string()),
            Ok(result) => Err(ConnectionTestError::CommandFailed {
                exit_status: result.exit_status,
                stderr: result.stderr.trim().to_string(),
            }),
            Err(err) => {
                if err.is_session_level() {
                    self.mark_stale(active.generation, err.to_string()).await;
                }
                Err(ConnectionTestError::Exec(err))
            }
        }
    }
}

/// Failure of [`ConnectionManager::test_connection`]
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConnectionTestError {
    /// Session could not be established
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The test command could not be run
    #[error(transparent)]
    Exec(#[from] ExecError),
    /// The test command ran but failed
    #[error("Test command exited with {exit_status:?}: {stderr}")]
    CommandFailed {
        /// Exit status reported by the remote side
        exit_status: Option<i32>,
        /// Remote stderr
        stderr: String,
    },
}
