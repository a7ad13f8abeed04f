//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// batchd - priority batch ingestion daemon
#[derive(Parser, Debug)]
#[command(
    name = "bd",
    about = "Priority-ordered, rate-limited batch ingestion daemon",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level override
    #[arg(short, long, global = true, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API and the batch processor
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Don't start draining batches at startup
        #[arg(long)]
        no_autostart: bool,

        /// Suppress batch event logging
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}
