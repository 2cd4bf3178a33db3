//! CLI parse: clap types for bcmaps. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bcmaps - capability map webhook listener
#[derive(Parser, Debug)]
#[command(name = "bcmaps")]
#[command(about = "Serve and publish business capability maps rebuilt on change events")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the local config/ folder
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the webhook listener
    Serve {
        /// Listen host (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Build one snapshot and print it
    Snapshot {
        /// Also upload it to the configured file host
        #[arg(long)]
        publish: bool,
        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
}
