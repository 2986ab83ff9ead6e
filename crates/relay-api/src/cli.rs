//! CLI definitions for the `relay` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stream chat turns and agent sessions through a single runtime.
#[derive(Parser)]
#[command(name = "relay", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the runtime configuration file.
    #[arg(short, long, global = true, env = "RELAY_CONFIG", default_value = "relay.toml")]
    pub config: PathBuf,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP streaming server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Load the configuration and print what the runtime would use.
    CheckConfig,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "info,relay=debug,relay_core=debug,relay_infra=debug",
            _ => "trace",
        }
    }
}
