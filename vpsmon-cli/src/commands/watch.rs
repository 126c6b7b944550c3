//! Periodic collection command.

use std::sync::Arc;

use vpsmon_core::{
    AppConfig, CachedCollector, MetricsEvent, MetricsSnapshot, SnapshotSource, start_distribution,
};

use super::OutputOptions;
use crate::cli::WatchFormat;
use crate::error::CliError;
use crate::format::format_summary;
use crate::util::{create_collector, create_runtime};

/// Watch command handler
///
/// Runs until interrupted with Ctrl+C or until `count` snapshots were shown.
/// Failed cycles are reported and retried on the next tick.
pub fn cmd_watch(
    mut config: AppConfig,
    interval: Option<u8>,
    format: WatchFormat,
    count: Option<u64>,
    output: OutputOptions,
) -> Result<(), CliError> {
    if let Some(interval) = interval {
        config.monitoring.interval_secs = interval;
    }
    let settings = config.monitoring.clone();
    let (manager, collector) = create_collector(config);

    let source: Arc<dyn SnapshotSource> = match settings.cache_ttl() {
        Some(ttl) => Arc::new(CachedCollector::new(collector, ttl)),
        None => collector,
    };

    let runtime = create_runtime()?;
    runtime.block_on(async {
        let (handle, mut events) = start_distribution(source, &settings);
        let mut shown: u64 = 0;

        if !output.quiet {
            eprintln!(
                "Watching {} every {}s (Ctrl+C to stop)",
                manager.config().address,
                settings.effective_interval_secs()
            );
        }

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(MetricsEvent::Update(snapshot)) => {
                        if count.is_some_and(|limit| shown >= limit) {
                            continue;
                        }
                        print_snapshot(&snapshot, format, output)?;
                        shown += 1;
                        if count.is_some_and(|limit| shown >= limit) {
                            handle.stop().await;
                        }
                    }
                    Some(MetricsEvent::CycleFailed(err)) => {
                        if !output.quiet {
                            eprintln!("Cycle failed: {err}");
                        }
                    }
                    Some(MetricsEvent::Stopped) | None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::debug!("Interrupted, stopping");
                    handle.stop().await;
                }
            }
        }

        manager.disconnect().await;
        Ok::<(), CliError>(())
    })
}

fn print_snapshot(
    snapshot: &MetricsSnapshot,
    format: WatchFormat,
    output: OutputOptions,
) -> Result<(), CliError> {
    match format {
        WatchFormat::Json => {
            let json = snapshot
                .to_json()
                .map_err(|e| CliError::Output(format!("Failed to serialize snapshot: {e}")))?;
            println!("{json}");
        }
        WatchFormat::Summary => {
            println!("{}", format_summary(snapshot, output.palette));
        }
    }
    Ok(())
}
