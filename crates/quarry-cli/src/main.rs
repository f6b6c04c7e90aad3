//! # quarry
//!
//! Mirrors a RubyGems compact index into a local repository and publishes
//! it again as a static gem source.
//!
//! This is the main entry point for the Quarry CLI. It handles command parsing,
//! sets up logging and error handling, and dispatches to the command handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quarry_core::{QuarryError, QuarryResult};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Gem index mirror and publisher
#[derive(Parser)]
#[command(name = "quarry", version, about = "Mirror and republish RubyGems indexes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to quarry.toml (default: nearest one above the working directory)
    #[arg(short, long, global = true, env = "QUARRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize the repository with the remote index
    Sync {
        /// Remove local gems that are no longer upstream
        #[arg(long)]
        mirror: bool,
    },
    /// Add local .gem files to the repository
    Add {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Publish the repository as a static gem source
    Publish {
        /// Output directory (overrides publish.output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the index record of a .gem file as JSON
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Check configuration
    Check,
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting Quarry v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", ErrorFormatter::new().format_error(&e));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> QuarryResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| QuarryError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.config)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(format!("quarry={}", level))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("quarry={}", level)))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Quarry encountered an unexpected error: {}", panic_info);
        eprintln!("Quarry crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
