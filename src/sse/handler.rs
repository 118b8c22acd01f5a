//! Axum glue: runs a session on its own task and answers the request.

use std::future::Future;

use axum::response::{IntoResponse, Response};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::session::SessionReport;
use super::sink::{PendingResponse, ResponseSink, response_channel};
use crate::error::{RelayError, StreamError};

/// Spawns a streaming session and resolves to the HTTP response.
///
/// `start` receives the session's sink and the connection token and
/// returns the session future, normally one of the entry points in
/// [`super::entry`]. The token is raised when the response body is dropped.
///
/// # Errors
///
/// Returns [`RelayError`] if the session ended before committing its
/// headers, for instance because the subscribe failed.
pub async fn respond_with_stream<F, Fut>(
    cancel: CancellationToken,
    start: F,
) -> Result<Response, RelayError>
where
    F: FnOnce(ResponseSink, CancellationToken) -> Fut,
    Fut: Future<Output = Result<SessionReport, StreamError>> + Send + 'static,
{
    let (sink, pending) = response_channel(cancel.clone());
    let session = tokio::spawn(start(sink, cancel));
    serve_stream(pending, session).await
}

/// Waits for `session` to commit its headers and builds the streaming
/// response; otherwise reports why it stopped.
///
/// # Errors
///
/// Returns [`RelayError`] if no headers were committed.
pub async fn serve_stream(
    mut pending: PendingResponse,
    session: JoinHandle<Result<SessionReport, StreamError>>,
) -> Result<Response, RelayError> {
    if let Some(headers) = pending.headers().await {
        return Ok((headers, pending.into_sse()).into_response());
    }

    match session.await {
        Ok(Err(err)) => Err(err.into()),
        Ok(Ok(report)) => {
            tracing::debug!(end = ?report.end, "stream ended before headers");
            Err(RelayError::Internal("stream ended before it started".to_string()))
        }
        Err(err) => Err(RelayError::Internal(err.to_string())),
    }
}
