//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stream Syncer - stamped-stream synchronization pipeline
#[derive(Parser, Debug)]
#[command(
    name = "stream-syncer",
    author,
    version,
    about = "Stamped-stream synchronization pipeline",
    long_about = "Aligns asynchronous streams of stamped messages into coherent captures.\n\n\
                  Buffers each configured stream behind a capture policy, runs the\n\
                  driver/follower capture protocol, and dispatches synchronized\n\
                  captures to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STREAM_SYNCER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STREAM_SYNCER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the synchronization pipeline with mock sources
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "pipeline.toml",
        env = "STREAM_SYNCER_CONFIG"
    )]
    pub config: PathBuf,

    /// Maximum number of synced captures to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "STREAM_SYNCER_MAX_CAPTURES")]
    pub max_captures: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STREAM_SYNCER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running the pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "100", env = "STREAM_SYNCER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "STREAM_SYNCER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pipeline.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
