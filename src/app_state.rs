//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backplane::InMemoryBackplane;
use crate::config::RelayConfig;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Backplane every stream subscribes to and every publish goes through.
    pub backplane: InMemoryBackplane,
    /// Loaded configuration.
    pub config: Arc<RelayConfig>,
    /// Raised on server shutdown; every connection token is a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds state around an existing backplane.
    #[must_use]
    pub fn new(backplane: InMemoryBackplane, config: RelayConfig) -> Self {
        Self {
            backplane,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancellation token for one client connection.
    ///
    /// Fires on server shutdown, and after `stream_max_duration` when one
    /// is configured.
    #[must_use]
    pub fn connection_token(&self) -> CancellationToken {
        let token = self.shutdown.child_token();
        if let Some(limit) = self.config.stream_max_duration {
            spawn_deadline(token.clone(), limit);
        }
        token
    }
}

fn spawn_deadline(token: CancellationToken, limit: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            () = tokio::time::sleep(limit) => {
                tracing::debug!(
                    limit_secs = limit.as_secs(),
                    "stream reached its maximum duration"
                );
                token.cancel();
            }
        }
    });
}
