//! Shared utility functions used across command modules.

use std::path::Path;
use std::sync::Arc;

use vpsmon_core::{
    AppConfig, ConnectionManager, HostConfig, LoggingSettings, MetricsCollector, SshTransport,
    TracingLevel,
};

use crate::error::CliError;

/// Loads the configuration from the optional `--config` path, the default
/// location, and `VPS_*` environment variables.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, CliError> {
    AppConfig::load(config_path).map_err(CliError::from)
}

/// Initializes logging to stderr (or the configured file).
///
/// `-v` flags override the configured level; `-q` limits output to errors.
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) {
    let mut config = settings.to_tracing_config();
    if quiet {
        config = config.with_level(TracingLevel::Error);
    } else if verbose > 0 || settings.level.is_none() {
        config = config.with_level(TracingLevel::from_verbosity(verbose));
    }

    if let Err(e) = vpsmon_core::init_tracing(&config) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }
}

/// Creates the async runtime used by command handlers
pub fn create_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("Failed to create async runtime: {e}")))
}

/// Builds a connection manager using the system `ssh` client
pub fn create_manager(host: HostConfig) -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::new(host, Arc::new(SshTransport::new())))
}

/// Builds the connection manager and collector for the configured host
pub fn create_collector(config: AppConfig) -> (Arc<ConnectionManager>, Arc<MetricsCollector>) {
    let manager = create_manager(config.host);
    let collector = Arc::new(MetricsCollector::new(
        Arc::clone(&manager),
        config.monitoring,
    ));
    (manager, collector)
}
