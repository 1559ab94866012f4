//! Aalim CLI entry point.

use aalim::cli::{commands, Cli, Commands};
use aalim::config::Settings;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("aalim={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Scrape {
            channel_url,
            output_dir,
            failed_log,
            workers,
            limit,
        } => {
            commands::run_scrape(channel_url, output_dir, failed_log, *workers, *limit, settings)
                .await?;
        }

        Commands::Corpus { action } => {
            commands::run_corpus(action)?;
        }

        Commands::Index {
            inputs,
            chunk_size,
            overlap,
            batch_size,
            clear,
        } => {
            commands::run_index(inputs, *chunk_size, *overlap, *batch_size, *clear, settings)
                .await?;
        }

        Commands::Search { query, k } => {
            commands::run_search(query, *k, settings).await?;
        }

        Commands::Ask { question, k } => {
            commands::run_ask(question, *k, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
