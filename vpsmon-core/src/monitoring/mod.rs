//! Remote host metrics: parsing, collection and distribution
//!
//! Agentless: every value comes from standard tools (`top`, `mpstat`,
//! `free`, `df`, `ps`, `lscpu`, `/etc/os-release`) run over the SSH session
//! owned by [`crate::session::ConnectionManager`].

mod cache;
mod collector;
mod distribution;
mod metrics;
mod parser;

pub use cache::{CachedCollector, SnapshotCache};
pub use collector::{COMMANDS_PER_CYCLE, MetricsCollector, SnapshotSource};
pub use distribution::{DistributionHandle, MetricsEvent, start_distribution};
pub use metrics::{
    CoreMetrics, CpuMetrics, DiskMetrics, MemoryMetrics, MetricsSnapshot, ProcessRecord,
    SystemIdentity, UNKNOWN, round_to,
};
pub use parser::{
    CPU_INFO_COMMAND, CPU_PER_CORE_COMMAND, CPU_TOTAL_COMMAND, DISK_COMMAND, MEMORY_COMMAND,
    MetricsParser, OS_RELEASE_COMMAND, process_command,
};
