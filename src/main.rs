//! Frog-jump telemetry - unified CLI
//!
//! Serves the telemetry HTTP API, applies migrations or prints reference
//! data, all against the configured SQLite database.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use frogjump_telemetry::{
    AppState, DatabasePool, DifficultyCatalog, StoreConfig, TelemetryConfig, TelemetryRepository,
    create_router,
};
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,frogjump_telemetry=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config(|key| std::env::var(key).ok())?;

    match cli.command {
        Command::Serve { .. } => run_server(config).await,
        Command::Migrate => run_migrate(config).await,
        Command::Difficulties => print_difficulties(config).await,
    }
}

/// Opens the pool off the async runtime; migrations run as part of opening.
async fn open_pool(store: &StoreConfig) -> Result<DatabasePool> {
    let store = store.clone();
    let pool = tokio::task::spawn_blocking(move || DatabasePool::open(&store)).await??;
    Ok(pool)
}

/// Run the HTTP telemetry server until ctrl-c.
#[instrument(skip_all, fields(host = %config.server().host(), port = config.server().port()))]
async fn run_server(config: TelemetryConfig) -> Result<()> {
    info!("Starting frog-jump telemetry server");

    let pool = open_pool(config.store()).await?;
    let repository = TelemetryRepository::new(pool.clone());
    let state = AppState::from_repository(
        repository,
        *config.sequencer(),
        config.server().request_timeout(),
    );
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind((config.server().host().as_str(), *config.server().port()))
            .await?;
    info!(address = %listener.local_addr()?, "Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    pool.close();
    Ok(())
}

/// Apply pending migrations and report what is applied.
#[instrument(skip_all, fields(database_url = %config.store().database_url()))]
async fn run_migrate(config: TelemetryConfig) -> Result<()> {
    let pool = open_pool(config.store()).await?;
    let reader = pool.clone();
    let applied = tokio::task::spawn_blocking(move || reader.applied_migrations()).await??;

    println!("Database: {}", pool.database_url());
    for version in &applied {
        println!("  applied {}", version);
    }
    info!(count = applied.len(), "Migrations up to date");
    pool.close();
    Ok(())
}

/// Print the difficulty catalog.
#[instrument(skip_all, fields(database_url = %config.store().database_url()))]
async fn print_difficulties(config: TelemetryConfig) -> Result<()> {
    let pool = open_pool(config.store()).await?;
    let catalog = DifficultyCatalog::new(Arc::new(TelemetryRepository::new(pool.clone())));

    for difficulty in catalog.list_all().await? {
        println!(
            "{:>3}  {:<10} {} blocks",
            difficulty.id(),
            difficulty.name(),
            difficulty.number_of_blocks()
        );
    }
    pool.close();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
    }
    info!("Shutdown signal received");
}
