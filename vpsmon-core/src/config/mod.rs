//! Configuration loading for vpsmon
//!
//! The configuration is a TOML file with `[host]`, `[monitoring]` and
//! `[logging]` sections. Connection values can be overridden from the
//! environment (`VPS_HOST`, `VPS_PORT`, `VPS_USER`, `VPS_PASS`, `VPS_KEY`),
//! which is how deployments usually inject credentials.

pub mod settings;

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

pub use settings::{
    AuthMethod, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_KEEPALIVE_INTERVAL_SECS, HostConfig, LoggingSettings, MonitoringSettings,
};

/// Directory name under the platform configuration directory
const CONFIG_DIR_NAME: &str = "vpsmon";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Complete application configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Monitored host
    pub host: HostConfig,
    /// Collection cadence
    pub monitoring: MonitoringSettings,
    /// Logging
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Parses a configuration from TOML text without validating it
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML for the schema.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Default configuration file location (`~/.config/vpsmon/config.toml`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if the platform has no config dir.
    pub fn default_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads, overrides from the process environment, and validates.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present; otherwise defaults plus environment are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting host configuration is incomplete.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => match Self::default_path() {
                Ok(default) if default.exists() => Self::read_file(&default)?,
                _ => {
                    tracing::debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_toml_str(&text)
    }

    /// Applies `VPS_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = present("VPS_HOST") {
            self.host.address = host;
        }
        if let Some(port) = present("VPS_PORT") {
            match port.parse() {
                Ok(port) => self.host.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid VPS_PORT"),
            }
        }
        if let Some(user) = present("VPS_USER") {
            self.host.username = user;
        }
        if let Some(pass) = present("VPS_PASS") {
            self.host.password = Some(SecretString::from(pass));
        }
        if let Some(key) = present("VPS_KEY") {
            self.host.identity_file = Some(PathBuf::from(key));
        }
    }

    /// Validates the host section
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.host.validate().map_err(ConfigError::Invalid)
    }
}
