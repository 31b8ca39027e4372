//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Walletgate CLI.
#[derive(Parser, Debug)]
#[command(name = "walletgate")]
#[command(author = "Walletgate Contributors")]
#[command(version)]
#[command(about = "Payment-gated gateway for wallet tools")]
#[command(
    long_about = "Walletgate exposes wallet operations as tools over WebSocket.\nPaid tools require an x402 payment proof or an explicit confirmation.\n\nRun 'walletgate init' to write a starter config."
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "WALLETGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },

    /// Print the tool listing with effective prices.
    Tools {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Run the gateway.
    Serve {
        /// Listen address, overriding `[server] listen`.
        #[arg(short, long)]
        listen: Option<String>,
    },
}
