//! # plinth-cli
//!
//! Command-line front end for the Plinth feature resolver.
//!
//! Parses commands, sets up logging, and dispatches to the command handlers.
//! Exit status is 0 on success, 1 when resolution or checking fails, and 2 on
//! configuration or catalog errors.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use plinth_core::error::{PlinthError, PlinthResult};
use tracing::{error, info};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Feature version resolver for plugin-based products
#[derive(Parser)]
#[command(name = "plinth", version, about = "Resolve consistent feature versions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the starting features in plinth.toml
    Resolve {
        /// Configuration file instead of the nearest plinth.toml
        #[arg(long, value_name = "FILE")]
        config: Option<Utf8PathBuf>,
        /// Catalog file, overriding the configured one
        #[arg(long, value_name = "FILE")]
        catalog: Option<String>,
        /// Version-selection policy: latest or lblm
        #[arg(long)]
        policy: Option<String>,
        /// Restarts allowed before giving up
        #[arg(long)]
        max_restarts: Option<usize>,
    },
    /// List the catalog versions of a feature
    Versions {
        feature: String,
        /// Configuration file instead of the nearest plinth.toml
        #[arg(long, value_name = "FILE")]
        config: Option<Utf8PathBuf>,
        /// Catalog file, used without any configuration
        #[arg(long, value_name = "FILE")]
        catalog: Option<Utf8PathBuf>,
    },
    /// Validate plinth.toml against its catalog
    Check {
        /// Configuration file instead of the nearest plinth.toml
        #[arg(long, value_name = "FILE")]
        config: Option<Utf8PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting Plinth CLI v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprint!("{}", ErrorFormatter::new().format_error(&err));
            ExitCode::from(2)
        },
    }
}

fn run_cli(cli: Cli) -> PlinthResult<bool> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| PlinthError::Io {
        message: "Failed to create async runtime".to_string(),
        source: e,
    })?;

    rt.block_on(async {
        let ctx = CommandContext::new()?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "plinth={level},plinth_core={level},plinth_catalog={level},plinth_config={level},plinth_resolver={level}"
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Plinth encountered an unexpected error: {}", panic_info);
        eprintln!("Plinth crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
