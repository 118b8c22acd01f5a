//! Client-facing side of a stream.
//!
//! [`EventSink`] is what a streaming session writes to. [`ResponseSink`] is
//! the HTTP implementation: it hands the response head to the waiting
//! handler through a oneshot and feeds [`Event`]s through a capacity-1
//! channel into an axum [`Sse`] body. Because the channel holds at most one
//! event, [`EventSink::flush`] only returns once the transport has taken the
//! previous frame, so a slow client throttles its own session.

use std::convert::Infallible;
use std::future::Future;

use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::sse::{Event, Sse};
use futures_util::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::SinkError;

/// Media type of an event stream.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Headers committed before the first body byte of every stream.
#[must_use]
pub fn sse_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

/// Destination of a streaming session.
///
/// A sink is owned by exactly one session; nothing else writes to it.
pub trait EventSink: Send {
    /// Commits the response head. Must happen once, before any frame.
    ///
    /// # Errors
    ///
    /// [`SinkError::HeadersAlreadySent`] on a second call,
    /// [`SinkError::Disconnected`] if the client is gone.
    fn send_headers(&mut self, headers: HeaderMap)
    -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Writes one `data: <json>` frame.
    ///
    /// # Errors
    ///
    /// [`SinkError::Disconnected`] if the client is gone.
    fn write_data(&mut self, json: String) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Waits until previously written frames have left the sink.
    ///
    /// # Errors
    ///
    /// [`SinkError::Disconnected`] if the client is gone.
    fn flush(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// HTTP response sink driven by a streaming session.
#[derive(Debug)]
pub struct ResponseSink {
    head: Option<oneshot::Sender<HeaderMap>>,
    body: mpsc::Sender<Event>,
}

/// Handler-side counterpart of a [`ResponseSink`].
#[derive(Debug)]
pub struct PendingResponse {
    head: oneshot::Receiver<HeaderMap>,
    body: mpsc::Receiver<Event>,
    disconnect: DropGuard,
}

/// Creates a connected sink/response pair.
///
/// `cancel` is raised as soon as the response body is dropped, which is
/// how a client disconnect reaches the session.
#[must_use]
pub fn response_channel(cancel: CancellationToken) -> (ResponseSink, PendingResponse) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(1);
    (
        ResponseSink {
            head: Some(head_tx),
            body: body_tx,
        },
        PendingResponse {
            head: head_rx,
            body: body_rx,
            disconnect: cancel.drop_guard(),
        },
    )
}

impl EventSink for ResponseSink {
    async fn send_headers(&mut self, headers: HeaderMap) -> Result<(), SinkError> {
        let head = self.head.take().ok_or(SinkError::HeadersAlreadySent)?;
        head.send(headers).map_err(|_| SinkError::Disconnected)
    }

    async fn write_data(&mut self, json: String) -> Result<(), SinkError> {
        self.body
            .send(Event::default().data(json))
            .await
            .map_err(|_| SinkError::Disconnected)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.body
            .reserve()
            .await
            .map(drop)
            .map_err(|_| SinkError::Disconnected)
    }
}

impl PendingResponse {
    /// Waits for the session to commit its headers.
    ///
    /// Returns `None` if the session ended without committing them.
    pub async fn headers(&mut self) -> Option<HeaderMap> {
        (&mut self.head).await.ok()
    }

    /// Turns the event receiver into an SSE response body.
    ///
    /// The stream owns the disconnect guard: when the server drops the body
    /// the session's cancellation token fires.
    #[must_use]
    pub fn into_sse(
        self,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
        let Self {
            body, disconnect, ..
        } = self;
        let events =
            futures_util::stream::unfold((body, disconnect), |(mut body, guard)| async move {
                body.recv()
                    .await
                    .map(|event| (Ok::<_, Infallible>(event), (body, guard)))
            });
        Sse::new(events)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Bytes;
    use axum::response::IntoResponse;
    use tokio_test::assert_ok;

    use super::*;

    #[test]
    fn headers_describe_event_stream() {
        let headers = sse_headers();
        assert_eq!(
            headers.get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/event-stream"))
        );
        assert_eq!(
            headers.get(CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-cache"))
        );
        assert_eq!(
            headers.get(CONNECTION),
            Some(&HeaderValue::from_static("keep-alive"))
        );
    }

    #[tokio::test]
    async fn headers_can_only_be_sent_once() {
        let (mut sink, mut pending) = response_channel(CancellationToken::new());
        assert_ok!(sink.send_headers(sse_headers()).await);
        assert_eq!(
            sink.send_headers(sse_headers()).await,
            Err(SinkError::HeadersAlreadySent)
        );
        assert!(pending.headers().await.is_some());
    }

    #[tokio::test]
    async fn pending_sees_no_headers_when_sink_dropped() {
        let (sink, mut pending) = response_channel(CancellationToken::new());
        drop(sink);
        assert!(pending.headers().await.is_none());
    }

    #[tokio::test]
    async fn dropping_pending_cancels_and_disconnects() {
        let token = CancellationToken::new();
        let (mut sink, pending) = response_channel(token.clone());
        drop(pending);

        assert!(token.is_cancelled());
        assert_eq!(
            sink.write_data("1".to_string()).await,
            Err(SinkError::Disconnected)
        );
    }

    #[tokio::test]
    async fn dropping_body_cancels() {
        let token = CancellationToken::new();
        let (_sink, pending) = response_channel(token.clone());
        let sse = pending.into_sse();
        assert!(!token.is_cancelled());
        drop(sse);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn flush_waits_for_body_to_take_frame() {
        let (mut sink, mut pending) = response_channel(CancellationToken::new());
        assert_ok!(sink.write_data("1".to_string()).await);

        let flush = tokio::spawn(async move {
            let result = sink.flush().await;
            (sink, result)
        });
        tokio::task::yield_now().await;
        assert!(!flush.is_finished());

        assert!(pending.body.recv().await.is_some());
        let Ok((_sink, result)) = flush.await else {
            panic!("flush task failed");
        };
        assert_ok!(result);
    }

    #[tokio::test]
    async fn body_carries_data_frames() {
        let (mut sink, pending) = response_channel(CancellationToken::new());
        assert_ok!(sink.write_data("{\"x\":1}".to_string()).await);
        drop(sink);

        let response = pending.into_sse().into_response();
        let Ok(body) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body failed");
        };
        assert_eq!(body, Bytes::from_static(b"data: {\"x\":1}\n\n"));
    }
}
