//! Data models for remote host metrics
//!
//! All types serialize to camelCase JSON. Field names and nesting are part
//! of the wire format consumed by dashboards and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for text fields the remote output did not provide
pub const UNKNOWN: &str = "Unknown";

/// Host identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemIdentity {
    /// OS pretty name (e.g. "Ubuntu 24.04.1 LTS")
    pub os: String,
    /// CPU model string
    pub cpu_model: String,
    /// Logical core count
    pub total_cores: u32,
    /// Maximum number of cores a dashboard should display
    pub max_cores: u32,
}

impl Default for SystemIdentity {
    fn default() -> Self {
        Self {
            os: UNKNOWN.to_string(),
            cpu_model: UNKNOWN.to_string(),
            total_cores: 0,
            max_cores: 0,
        }
    }
}

/// Utilisation of one logical core over the sample window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreMetrics {
    /// Display label, e.g. "CPU 0"
    pub core: String,
    /// User time %
    pub user: f64,
    /// System time %
    pub system: f64,
    /// I/O wait %
    pub iowait: f64,
    /// Idle %
    pub idle: f64,
    /// `100 - idle`
    pub usage: f64,
}

/// Aggregate and per-core CPU utilisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Aggregate usage % (0–100, two decimals)
    pub usage: f64,
    /// Per-core records in the order reported by the remote tool
    pub cores: Vec<CoreMetrics>,
    /// CPU model name
    pub model: String,
    /// Clock speed as reported (MHz)
    pub speed: String,
}

impl Default for CpuMetrics {
    fn default() -> Self {
        Self {
            usage: 0.0,
            cores: Vec::new(),
            model: UNKNOWN.to_string(),
            speed: UNKNOWN.to_string(),
        }
    }
}

/// Physical memory in megabytes
///
/// `used + free` may be less than `total`; the remainder is buffers and
/// page cache.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    /// Total memory (MB)
    pub total: u64,
    /// Used memory (MB)
    pub used: u64,
    /// Free memory (MB)
    pub free: u64,
    /// `used / total * 100`, one decimal
    pub usage_percent: f64,
}

/// Root filesystem usage, in the remote tool's own units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskMetrics {
    /// Size (e.g. "50G")
    pub total: String,
    /// Used (e.g. "21G")
    pub used: String,
    /// Available (e.g. "27G")
    pub free: String,
    /// Use% (e.g. "44%")
    pub usage: String,
}

impl Default for DiskMetrics {
    fn default() -> Self {
        Self {
            total: UNKNOWN.to_string(),
            used: UNKNOWN.to_string(),
            free: UNKNOWN.to_string(),
            usage: UNKNOWN.to_string(),
        }
    }
}

/// One row of the top-CPU process table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Owner
    pub user: String,
    /// Process id
    pub pid: u32,
    /// CPU %
    pub cpu: f64,
    /// Memory %
    pub memory: f64,
    /// Executable name
    pub command: String,
}

/// Everything collected in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Host identity
    pub system: SystemIdentity,
    /// CPU utilisation
    pub cpu: CpuMetrics,
    /// Memory usage
    pub memory: MemoryMetrics,
    /// Root filesystem usage
    pub disk: DiskMetrics,
    /// Top processes by CPU, highest first
    pub processes: Vec<ProcessRecord>,
}

impl MetricsSnapshot {
    /// Serializes to the JSON wire format
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (not expected for these types).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses the JSON wire format
    ///
    /// # Errors
    ///
    /// Returns an error if `json` does not match the snapshot schema.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Rounds to `decimals` decimal places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
