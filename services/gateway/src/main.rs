mod config;
mod error;
mod feed;
mod handlers;
mod router;
mod state;

use anyhow::Context;
use config::GatewayConfig;
use feed::FeedClient;
use router::create_router;
use sale_window::WindowService;
use state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting sale feed gateway");

    let config = GatewayConfig::from_env().context("Invalid gateway configuration")?;

    // Window + sweeper
    let service =
        WindowService::start(config.window.clone()).context("Invalid window configuration")?;

    // Upstream feed
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feed_task = if config.feed.enabled {
        let client = FeedClient::new(config.feed.clone(), Arc::new(service.ingester()));
        Some(tokio::spawn(async move { client.run(shutdown_rx).await }))
    } else {
        tracing::warn!("Sale feed disabled, window will stay empty");
        None
    };

    let app = create_router(AppState::new(&service));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Some(task) = feed_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Sale feed task panicked");
        }
    }
    service.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
