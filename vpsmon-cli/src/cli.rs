//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// `vpsmon` command-line interface for remote host health monitoring
#[derive(Parser)]
#[command(name = "vpsmon")]
#[command(author, version, about = "Remote host health metrics over SSH")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one collection cycle and print the snapshot as JSON
    #[command(about = "Collect one metrics snapshot and print it as JSON")]
    Collect {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Collect continuously at a fixed interval
    #[command(about = "Collect metrics periodically until interrupted")]
    Watch {
        /// Seconds between cycles (1-60, defaults to the configured interval)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=60))]
        interval: Option<u8>,

        /// Output format for each snapshot
        #[arg(short, long, default_value = "summary", value_enum)]
        format: WatchFormat,

        /// Stop after this many snapshots
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Test connectivity to the configured host
    #[command(about = "Connect and run a round-trip test command")]
    Test,
}

/// Output format options for `watch`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WatchFormat {
    /// Human-readable summary
    Summary,
    /// One JSON snapshot per line
    Json,
}
