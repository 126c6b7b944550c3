//! Command handler modules for the CLI.

mod collect;
mod watch;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::format::Palette;
use crate::util::{init_logging, load_config};

/// Output options shared by all commands
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Suppress informational output
    pub quiet: bool,
    /// ANSI styling for human-readable output
    pub palette: Palette,
}

/// Load configuration, set up logging, and dispatch to the command handler.
pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose, cli.quiet);

    let output = OutputOptions {
        quiet: cli.quiet,
        palette: Palette::new(!cli.no_color),
    };

    match cli.command {
        Commands::Collect { pretty } => collect::cmd_collect(config, pretty),
        Commands::Watch {
            interval,
            format,
            count,
        } => watch::cmd_watch(config, interval, format, count, output),
        Commands::Test => test::cmd_test(config, output),
    }
}
