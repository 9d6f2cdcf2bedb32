//! Provider health check runner
//!
//! One-shot CLI that rents an allow-listed provider on the compute
//! marketplace, runs a trivial probe task on it, and reports every
//! lifecycle milestone to the stats backend.

mod cli;
mod config;
mod error;
mod executor;
mod logging;
mod report;
mod runner;
mod version;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands, ConfigSubcommand};
use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use crate::executor::RestExecutor;
use crate::report::HttpReporter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(())
        }
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Run {
            provider_id,
            network,
            task_id,
            config,
            report_url,
        } => {
            let config = load_config(config.as_deref(), report_url);

            // The guards must be kept alive for the lifetime of the program
            let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

            // One run, one logical thread of control; every await point is
            // an external operation
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

            runtime.block_on(run_healthcheck(config, provider_id, network, task_id))
        }
    }
}

/// Load the configuration, exiting with a formatted error when it is invalid
fn load_config(path: Option<&str>, report_url: Option<String>) -> RunnerConfig {
    match RunnerConfig::load(path) {
        Ok(mut cfg) => {
            // CLI override beats everything
            if report_url.is_some() {
                cfg.reporter.base_url = report_url;
            }
            cfg
        }
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    }
}

/// Drive one health check run end to end
async fn run_healthcheck(
    config: RunnerConfig,
    provider_id: String,
    network: String,
    task_id: Option<String>,
) -> Result<()> {
    let build = version::build_info();
    info!(version = %build.full_version(), "Starting healthcheck runner");

    // The backend usually assigns the task id; generate one for standalone runs
    let task_id = task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let reporter = HttpReporter::new(&config.reporter)?;
    let executor = RestExecutor::new(
        &config.executor,
        vec![provider_id.clone()],
        network.clone(),
    )?;

    info!(
        task_id = %task_id,
        provider_id = %provider_id,
        network = %network,
        image = %config.executor.image,
        budget = %config.executor.budget,
        endpoint = %reporter.endpoint(),
        "Run configured"
    );

    let outcome = runner::run(&executor, &reporter, &task_id).await;
    info!(task_id = %task_id, ?outcome, "Run finished");

    // The stats backend is the user-visible channel; a completed run is
    // not a process error whatever its outcome
    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = match RunnerConfig::load(config.as_deref()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprint!("{}", e.format_for_terminal());
                    std::process::exit(e.exit_code());
                }
            };
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            config::init_config(path.as_deref(), force)?;
        }
        ConfigSubcommand::Validate { config } => match RunnerConfig::load(config.as_deref()) {
            Ok(_) => {
                println!("Configuration is valid.");
            }
            Err(e) => {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
        },
    }

    Ok(())
}
