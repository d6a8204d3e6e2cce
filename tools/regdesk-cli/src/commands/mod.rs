//! CLI command implementations.

pub mod config;
pub mod simulate;

use clap::{Args, Subcommand};

use crate::backend::FailureMode;

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Query latency in milliseconds (overrides simulation.latency_ms).
    #[arg(short, long)]
    pub latency_ms: Option<u64>,

    /// Loader deadline in milliseconds (overrides loader.timeout_ms).
    #[arg(short, long)]
    pub timeout_ms: Option<u64>,

    /// Failure mode (overrides simulation.failure).
    #[arg(short, long, value_enum)]
    pub fail: Option<FailureMode>,

    /// Number of queries that succeed before failures start.
    #[arg(long)]
    pub fail_after: Option<usize>,

    /// Number of manual reloads after the initial load.
    #[arg(short, long, default_value_t = 1)]
    pub reloads: usize,

    /// Fire a second reload while the first is in flight.
    #[arg(long)]
    pub supersede: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Write a default regdesk.toml in the current directory
    Init {
        /// Overwrite an existing file without asking.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}
