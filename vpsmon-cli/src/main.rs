//! `vpsmon` CLI - Command-line interface for remote host monitoring
//!
//! Collects CPU, memory, disk, and process metrics from a Linux host over
//! SSH, either once (`collect`) or periodically (`watch`).

mod cli;
mod commands;
mod error;
mod format;
mod util;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let quiet = cli.quiet;

    if let Err(e) = commands::dispatch(cli) {
        if !quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
