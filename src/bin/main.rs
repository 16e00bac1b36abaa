//! Vaidya binary.
//!
//! Entry point for the Vaidya model server, which serves diabetes risk
//! predictions from tabular data and brain tumor classification of MRI scans.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use vaidya_core::{
    cli::commands::Commands,
    cli::handlers::{handle_config, handle_server},
    config::ServiceConfig,
    logging::init_logging,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config =
        ServiceConfig::load(cli.command.config_args()).context("Failed to load configuration")?;

    match &cli.command {
        Commands::Server(cmd) => {
            let _guard = init_logging(&config.logging)?;
            info!("Vaidya starting up");
            handle_server(cmd, config).await?
        }
        Commands::Config(_) => handle_config(&config)?,
    }

    Ok(())
}
