//! relay-sse server entry point.
//!
//! Starts the Axum HTTP server with stream and publish endpoints backed by
//! the in-process backplane.

use relay_sse::api;
use relay_sse::app_state::AppState;
use relay_sse::backplane::InMemoryBackplane;
use relay_sse::config::{LogFormat, RelayConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting relay-sse");

    // Build backplane and application state
    let backplane = InMemoryBackplane::new(config.subscriber_buffer);
    let listen_addr = config.listen_addr;
    let state = AppState::new(backplane.clone(), config);
    let shutdown = state.shutdown.clone();

    // Build router
    let app = api::build_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down, closing streams");
            shutdown.cancel();
        })
        .await?;

    backplane.shutdown().await;
    Ok(())
}
