use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mnemon::cli::{Cli, Commands};
use mnemon::commands;
use mnemon::config::Config;

/// We need an async main function for the async code
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with stderr output so stdout stays machine-parseable
    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    if config.anthropic_api_key.is_none() {
        eprintln!("Warning: ANTHROPIC_API_KEY not set, natural language queries are disabled");
    }

    match cli.command {
        Commands::Search(args) => commands::search::run(&config, args).await?,
        Commands::Episodes { command } => commands::episodes::run(&config, command).await?,
        Commands::Maintenance { command } => commands::maintenance::run(&config, command).await?,
        Commands::Query(args) => commands::query::run(&config, args).await?,
    }

    Ok(())
}
