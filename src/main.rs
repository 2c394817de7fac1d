use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use configuration::ConfigStore;
use database::Database;
use lifecycle::Hooks;
use logger::Logger;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the Nodelab service host.
#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    run(cli).await
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Hosts the shared platform resources: configuration, logging and the database.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the JSON configuration file.
    #[arg(long, env = "NODELAB_CONFIG", default_value = ConfigStore::DEFAULT_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Start the resources and keep them up until Ctrl-C (the default).
    Run,
    /// Start the resources, check the database once and shut down.
    Ping,
}

// ==============================================================================
// Host Wiring
// ==============================================================================

async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Run);

    // Constructed in dependency order: config, then logger, then database.
    let config = ConfigStore::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let logger = Logger::from_config(&config).context("Failed to initialize logger")?;

    let mut hooks = Hooks::new();
    let db = match Database::new(&mut hooks, &config).await {
        Ok(db) => db,
        Err(e) => {
            logger.errorf(format_args!("Failed to connect to database: {e}"));
            return Err(e).context("Database is unavailable");
        }
    };

    hooks.start().await.context("Startup hooks failed")?;

    let healthy = check_database(&logger, &db).await;

    if command == Commands::Run {
        logger.info("Running. Press Ctrl-C to stop.");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for the shutdown signal")?;
        logger.info("Shutdown signal received.");
    }

    match hooks.stop().await {
        Ok(()) => logger.success("Shutdown complete."),
        Err(e) => {
            logger.errorf(format_args!("Shutdown finished with errors: {e}"));
            return Err(e.into());
        }
    }

    if command == Commands::Ping && !healthy {
        anyhow::bail!("Database ping failed");
    }
    Ok(())
}

async fn check_database(logger: &Logger, db: &Database) -> bool {
    match db.ping().await {
        Ok(()) => {
            logger.success("Connected to database successfully");
            true
        }
        Err(e) => {
            logger.errorf(format_args!("Failed to ping database: {e}"));
            false
        }
    }
}
