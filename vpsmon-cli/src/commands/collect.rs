//! One-shot collection command.

use vpsmon_core::AppConfig;

use crate::error::CliError;
use crate::util::{create_collector, create_runtime};

/// Collect command handler
pub fn cmd_collect(config: AppConfig, pretty: bool) -> Result<(), CliError> {
    let (manager, collector) = create_collector(config);
    let runtime = create_runtime()?;

    let snapshot = runtime.block_on(async {
        let result = collector.collect().await;
        manager.disconnect().await;
        result
    })?;

    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        snapshot.to_json()
    }
    .map_err(|e| CliError::Output(format!("Failed to serialize snapshot: {e}")))?;

    println!("{json}");
    Ok(())
}
