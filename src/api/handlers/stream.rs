//! Event stream endpoint handlers.

use axum::Router;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;

use crate::api::dto::{ChannelPath, TypedChannelPath};
use crate::app_state::AppState;
use crate::domain::Channel;
use crate::error::RelayError;
use crate::sse::{respond_with_stream, stream_untyped};

/// `GET /streams/{domain}/{identifier}` — Stream every message on
/// `domain:identifier`.
///
/// # Errors
///
/// Returns [`RelayError`] on an invalid path or when the backplane rejects
/// the subscription. No event-stream headers are sent in that case.
pub async fn stream_channel(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
) -> Result<Response, RelayError> {
    let channel = path.channel()?;
    open_stream(state, channel).await
}

/// `GET /streams/{domain}/{identifier}/{event_type}` — Stream every message
/// on `domain:identifier:event_type`.
///
/// # Errors
///
/// Returns [`RelayError`] on an invalid path or when the backplane rejects
/// the subscription.
pub async fn stream_event_channel(
    State(state): State<AppState>,
    Path(path): Path<TypedChannelPath>,
) -> Result<Response, RelayError> {
    let channel = path.channel()?;
    open_stream(state, channel).await
}

async fn open_stream(state: AppState, channel: Channel) -> Result<Response, RelayError> {
    tracing::debug!(channel = %channel, "opening stream");
    let backplane = state.backplane.clone();
    respond_with_stream(state.connection_token(), move |sink, cancel| async move {
        stream_untyped(backplane, channel, sink, &cancel).await
    })
    .await
}

/// Stream routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/streams/{domain}/{identifier}", get(stream_channel))
        .route(
            "/streams/{domain}/{identifier}/{event_type}",
            get(stream_event_channel),
        )
}
