//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ZeroMQ Forwarder - ship metrics to a broker over DEALER sockets
#[derive(Parser, Debug)]
#[command(
    name = "zmq-forwarder",
    author,
    version,
    about = "Forward metrics to a ZeroMQ broker",
    long_about = "Reads metrics as JSON lines, serializes them per output and sends each \n\
                  payload as a four-frame envelope over a DEALER socket.\n\n\
                  Every output in the configuration gets its own socket, identity \n\
                  and worker."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ZMQ_FORWARDER_VERBOSE")]
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
        env = "ZMQ_FORWARDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Forward metrics to every configured output
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "forwarder.toml",
        env = "ZMQ_FORWARDER_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON-lines metric file (stdin when omitted)
    #[arg(short, long, env = "ZMQ_FORWARDER_INPUT")]
    pub input: Option<PathBuf>,

    /// Metrics per batch handed to each output
    #[arg(long, default_value = "100", env = "ZMQ_FORWARDER_BATCH_SIZE")]
    pub batch_size: usize,

    /// Stop after this many metrics (0 = unlimited)
    #[arg(long, default_value = "0", env = "ZMQ_FORWARDER_MAX_METRICS")]
    pub max_metrics: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "ZMQ_FORWARDER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "ZMQ_FORWARDER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "forwarder.toml")]
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

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
