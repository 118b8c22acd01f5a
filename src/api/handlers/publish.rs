//! Publish endpoint handlers.
//!
//! Producers normally publish straight to the backplane; these endpoints
//! let external processes and tests push messages over HTTP.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ChannelPath, PublishRequest, PublishResponse, TypedChannelPath};
use crate::app_state::AppState;
use crate::backplane::Backplane;
use crate::domain::Channel;
use crate::error::RelayError;

/// `POST /publish/{domain}/{identifier}` — Publish to `domain:identifier`.
///
/// # Errors
///
/// Returns [`RelayError`] on an invalid path or an unavailable backplane.
pub async fn publish_channel(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, RelayError> {
    let channel = path.channel()?;
    publish(&state, channel, req).await
}

/// `POST /publish/{domain}/{identifier}/{event_type}` — Publish to
/// `domain:identifier:event_type`.
///
/// # Errors
///
/// Returns [`RelayError`] on an invalid path or an unavailable backplane.
pub async fn publish_event_channel(
    State(state): State<AppState>,
    Path(path): Path<TypedChannelPath>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, RelayError> {
    let channel = path.channel()?;
    publish(&state, channel, req).await
}

async fn publish(
    state: &AppState,
    channel: Channel,
    req: PublishRequest,
) -> Result<Json<PublishResponse>, RelayError> {
    let delivered = state
        .backplane
        .publish_to_group(&channel, req.into())
        .await?;
    tracing::debug!(channel = %channel, delivered, "published");
    Ok(Json(PublishResponse { channel, delivered }))
}

/// Publish routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/publish/{domain}/{identifier}", post(publish_channel))
        .route(
            "/publish/{domain}/{identifier}/{event_type}",
            post(publish_event_channel),
        )
}
