//! dbconnector CLI
//!
//! Command-line interface for the MySQL and MongoDB connectors.

use anyhow::Context;
use clap::Parser;
use dbconnector_cli::output::format_error;
use dbconnector_cli::{Cli, Commands};
use dbconnector_core::ConnectorError;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Full details are in the log output
        let (message, code) = match e.downcast_ref::<ConnectorError>() {
            Some(err) if err.is_client_error() => (format!("{:#}", e), 2),
            Some(err) => (format!("{}: {}", e, err.sanitized_message()), 1),
            None => (format!("{:#}", e), 1),
        };
        eprintln!("{}", format_error(&message));
        std::process::exit(code);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Execute command
    let connector = cli.command.connector();
    let result = match &cli.command {
        Commands::Mysql(cmd) => cmd.execute(&cli.file).await,
        Commands::Mongo(cmd) => cmd.execute(&cli.file).await,
    };
    result.with_context(|| format!("{} command failed (profile: {})", connector, cli.file))?;

    Ok(())
}
