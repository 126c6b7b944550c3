//! Remote session lifecycle and command execution
//!
//! - [`ConnectionManager`] owns the session state machine and connects lazily
//! - [`CommandExecutor`] runs command batches concurrently over a session
//! - [`RemoteTransport`] / [`RemoteChannel`] are the seam to the SSH client

mod executor;
mod manager;
pub mod ssh;
mod state;
mod transport;

pub use executor::CommandExecutor;
pub use manager::{
    ActiveSession, CONNECTION_TEST_COMMAND, ConnectionManager, ConnectionTestError,
};
pub use ssh::{SshChannel, SshTransport};
pub use state::{RemoteSession, SessionState};
pub use transport::{CommandResult, RemoteChannel, RemoteTransport};
