use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use spendlog::{
    api::{self, AppState},
    config::{CliArgs, Config},
    service::RecordService,
    store, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli)?;

    telemetry::init_logging(&config.logging);
    let metrics = telemetry::init_metrics().context("failed to install metrics recorder")?;

    let storage_config = config.storage.clone();
    let record_store = tokio::task::spawn_blocking(move || store::open(&storage_config))
        .await?
        .context("failed to open record store")?;

    let service = Arc::new(RecordService::new(record_store.clone()));
    let app = api::router(AppState::new(service).with_metrics(metrics));

    let addr = config.listen_addr()?;
    tracing::info!(%addr, backend = ?config.storage.backend, "API listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tokio::task::spawn_blocking(move || store::close(record_store))
        .await?
        .context("failed to close record store")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
