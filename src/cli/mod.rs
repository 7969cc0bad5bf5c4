//! CLI module for Aurora.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Aurora - grounded question answering over a message feed
///
/// Fetches messages, indexes them, and answers questions using only what the
/// messages say.
#[derive(Parser, Debug)]
#[command(name = "aurora")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "AURORA_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch the messages and answer a single question
    Ask {
        /// The question to ask
        question: String,

        /// Number of messages to retrieve (overrides retrieval.k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the retrieved messages after the answer
        #[arg(short, long)]
        sources: bool,
    },

    /// Fetch the messages, build the index and report what was indexed
    Refresh,

    /// Show the messages nearest to a query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
