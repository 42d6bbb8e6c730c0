//! parity-probe - differential REST API regression runner
//!
//! Sends identical requests to a dev and a release deployment of the same
//! API and fails when their status codes or bodies disagree.

use clap::Parser;
use parity_probe::cli::{self, GlobalOptions};
use parity_probe::commands::Commands;
use parity_probe::common::config::Overrides;
use parity_probe::common::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parity-probe", about = "Compare two deployments of a REST API")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the dev environment
    #[arg(long, global = true)]
    dev_url: Option<String>,

    /// Base URL of the release environment
    #[arg(long, global = true)]
    release_url: Option<String>,

    /// Bearer token sent on every request
    #[arg(long, global = true)]
    token: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let _guard = match logging::init_cli(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: could not open log file: {e}");
            std::process::exit(1);
        }
    };

    let global = GlobalOptions {
        config: cli.config,
        overrides: Overrides {
            token: cli.token,
            dev_url: cli.dev_url,
            release_url: cli.release_url,
        },
    };

    if let Err(e) = cli::dispatch(cli.command, global).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
