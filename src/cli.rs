//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the healthcheck runner.

use clap::{Parser, Subcommand};

/// Healthcheck runner - probes a marketplace provider with one remote task
///
/// Rents the given provider on the compute marketplace, runs a trivial
/// arithmetic task inside a minimal container, and reports every lifecycle
/// milestone to the stats backend.
#[derive(Parser, Debug)]
#[command(name = "healthcheck-runner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the runner
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one health check task against a provider
    Run {
        /// Provider node ID to allow-list for this run
        provider_id: String,

        /// Payment network to settle on (e.g. holesky, polygon)
        network: String,

        /// Task ID assigned by the stats backend (generated when omitted)
        task_id: Option<String>,

        /// Path to configuration file
        #[arg(short, long, env = "HEALTHCHECK_CONFIG")]
        config: Option<String>,

        /// Override the status backend base URL for this run
        #[arg(long, env = "HEALTHCHECK_REPORT_URL")]
        report_url: Option<String>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
