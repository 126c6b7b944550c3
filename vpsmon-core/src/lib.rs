//! `vpsmon` Core Library
//!
//! Collects point-in-time health metrics from one remote Linux host over SSH
//! and turns raw command output into structured snapshots.
//!
//! # Crate Structure
//!
//! - [`session`] - Remote session state machine, SSH transport, concurrent command execution
//! - [`monitoring`] - Output parsers, collection cycle, distribution loop, snapshot cache
//! - [`config`] - Host and monitoring settings loaded from TOML and the environment
//! - [`error`] - Error types for connection, execution, collection and configuration
//! - [`tracing`] - Structured logging setup and standard span names
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vpsmon_core::{AppConfig, ConnectionManager, MetricsCollector, SshTransport};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! let manager = ConnectionManager::new(config.host, Arc::new(SshTransport::new()));
//! let collector = MetricsCollector::new(Arc::new(manager), config.monitoring);
//! let snapshot = collector.collect().await?;
//! println!("{}", snapshot.to_json()?);
//! # Ok(())
//! # }
//! ```

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod monitoring;
pub mod session;
pub mod tracing;

// =============================================================================
// Convenience re-exports
// =============================================================================

pub use config::{AppConfig, AuthMethod, HostConfig, LoggingSettings, MonitoringSettings};
pub use error::{
    ConfigError, ConfigResult, ConnectionError, ExecError, MonitorError, MonitorResult,
};
pub use monitoring::{
    CachedCollector, CoreMetrics, CpuMetrics, DiskMetrics, DistributionHandle, MemoryMetrics,
    MetricsCollector, MetricsEvent, MetricsParser, MetricsSnapshot, ProcessRecord, SnapshotCache,
    SnapshotSource, SystemIdentity, start_distribution,
};
pub use session::{
    CommandExecutor, CommandResult, ConnectionManager, ConnectionTestError, RemoteChannel,
    RemoteSession, RemoteTransport, SessionState, SshTransport,
};
pub use tracing::{TracingConfig, TracingLevel, TracingOutput, init_tracing};
