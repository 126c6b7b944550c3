//! Metrics collector for one remote host
//!
//! A cycle connects lazily through the [`ConnectionManager`], runs the seven
//! metric commands concurrently over the session, parses each output, and
//! assembles a [`MetricsSnapshot`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::MonitoringSettings;
use crate::error::{ExecError, MonitorError, MonitorResult};
use crate::session::{CommandExecutor, CommandResult, ConnectionManager};
use crate::tracing::span_names;

use super::metrics::MetricsSnapshot;
use super::parser::{
    CPU_INFO_COMMAND, CPU_PER_CORE_COMMAND, CPU_TOTAL_COMMAND, DISK_COMMAND, MEMORY_COMMAND,
    MetricsParser, OS_RELEASE_COMMAND, process_command,
};

/// Number of commands issued per cycle
pub const COMMANDS_PER_CYCLE: usize = 7;

/// Anything that can produce a snapshot on demand
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Produces a snapshot, running a collection cycle if needed
    ///
    /// # Errors
    ///
    /// Returns the [`MonitorError`] of the failed cycle.
    async fn snapshot(&self) -> MonitorResult<Arc<MetricsSnapshot>>;
}

/// Runs collection cycles against one host
#[derive(Debug)]
pub struct MetricsCollector {
    manager: Arc<ConnectionManager>,
    executor: CommandExecutor,
    settings: MonitoringSettings,
    process_command: String,
}

impl MetricsCollector {
    /// Creates a collector sharing `manager`'s session
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>, settings: MonitoringSettings) -> Self {
        let executor = CommandExecutor::new(manager.config().command_timeout());
        let process_command = process_command(settings.effective_process_limit());
        Self {
            manager,
            executor,
            settings,
            process_command,
        }
    }

    /// Connection manager used by this collector
    #[must_use]
    pub const fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Monitoring settings used by this collector
    #[must_use]
    pub const fn settings(&self) -> &MonitoringSettings {
        &self.settings
    }

    /// Commands issued each cycle, in the order their outputs are parsed
    #[must_use]
    pub fn commands(&self) -> [&str; COMMANDS_PER_CYCLE] {
        [
            CPU_TOTAL_COMMAND,
            CPU_PER_CORE_COMMAND,
            MEMORY_COMMAND,
            DISK_COMMAND,
            self.process_command.as_str(),
            CPU_INFO_COMMAND,
            OS_RELEASE_COMMAND,
        ]
    }

    /// Runs one collection cycle.
    ///
    /// A command that fails on its own (non-zero exit, channel refused)
    /// degrades only the fields parsed from it. A session drop or timeout
    /// fails the whole cycle and marks the session stale, so the next call
    /// reconnects.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::Connection`] if the session cannot be established
    /// - [`MonitorError::Transport`] if the session dropped mid-batch
    /// - [`MonitorError::Timeout`] if a command exceeded its timeout
    pub async fn collect(&self) -> MonitorResult<MetricsSnapshot> {
        let span = info_span!(span_names::METRICS_COLLECT, host = %self.manager.config().address);
        self.collect_inner().instrument(span).await
    }

    async fn collect_inner(&self) -> MonitorResult<MetricsSnapshot> {
        let started = Instant::now();
        let active = self.manager.ensure_connected().await?;

        let commands = self.commands();
        let results = self.executor.run(&active.channel, &commands).await;

        if let Some((command, err)) = commands
            .iter()
            .zip(&results)
            .find_map(|(command, result)| match result {
                Err(err) if err.is_session_level() => Some((*command, err)),
                _ => None,
            })
        {
            self.manager
                .mark_stale(active.generation, err.to_string())
                .await;
            return Err(MonitorError::from_exec(command, err));
        }

        let outputs: Vec<String> = commands
            .iter()
            .zip(results)
            .map(|(command, result)| Self::usable_output(command, result))
            .collect();
        let [top, mpstat, free, df, ps, lscpu, os_release]: [String; COMMANDS_PER_CYCLE] = outputs
            .try_into()
            .map_err(|v: Vec<String>| {
                MonitorError::Collection(format!("Expected {COMMANDS_PER_CYCLE} outputs, got {}", v.len()))
            })?;

        let mut system = MetricsParser::parse_system_identity(
            &os_release,
            &lscpu,
            self.settings.max_cores_display,
        );
        let cpu = MetricsParser::parse_cpu(&top, &mpstat, &lscpu);
        if system.total_cores == 0 {
            system.total_cores = u32::try_from(cpu.cores.len()).unwrap_or(u32::MAX);
        }

        let snapshot = MetricsSnapshot {
            timestamp: Utc::now(),
            system,
            cpu,
            memory: MetricsParser::parse_memory(&free),
            disk: MetricsParser::parse_disk(&df),
            processes: MetricsParser::parse_processes(&ps),
        };

        debug!(
            duration_ms = started.elapsed().as_millis() as u64,
            cpu = snapshot.cpu.usage,
            memory = snapshot.memory.usage_percent,
            cores = snapshot.cpu.cores.len(),
            processes = snapshot.processes.len(),
            "Collection cycle finished"
        );
        Ok(snapshot)
    }

    /// Stdout of a command that ran cleanly, empty text otherwise
    fn usable_output(command: &str, result: Result<CommandResult, ExecError>) -> String {
        match result {
            Ok(result) if result.is_success() => result.stdout,
            Ok(result) => {
                warn!(
                    command,
                    exit_status = ?result.exit_status,
                    stderr = %result.stderr.trim(),
                    "Remote command failed, its metrics are degraded"
                );
                String::new()
            }
            Err(err) => {
                warn!(command, error = %err, "Remote command could not run, its metrics are degraded");
                String::new()
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for MetricsCollector {
    async fn snapshot(&self) -> MonitorResult<Arc<MetricsSnapshot>> {
        self.collect().await.map(Arc::new)
    }
}
