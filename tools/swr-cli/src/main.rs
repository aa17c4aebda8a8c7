//! SWR CLI - Exercise the stale-while-revalidate coordinator.
//!
//! Commands:
//! - `swr simulate` - Replay read traffic against demo endpoints
//! - `swr key` - Derive the cache key for a request

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{KeyArgs, SimulateArgs};

/// SWR CLI - Drive the caching coordinator from the command line
#[derive(Parser)]
#[command(name = "swr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay read traffic against the demo endpoints
    Simulate(SimulateArgs),

    /// Derive the cache key for a request identity
    Key(KeyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose);
    let config = config::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args, &config, &output).await,
        Commands::Key(args) => commands::key::run(args, &config, &output),
    };

    if let Err(e) = result {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
