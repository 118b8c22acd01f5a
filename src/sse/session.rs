//! Streaming session state machine.
//!
//! One [`StreamingSession`] serves one client connection:
//!
//! ```text
//! Idle ─subscribe─▶ Subscribed ─(initial state)─▶ InitialStateSent
//!                        │                              │
//!                        └──────────────▶ Streaming ◀───┘
//!                                            │
//!            any exit (end of source, cancel, write/encode failure)
//!                                            ▼
//!                                  Closing ─unsubscribe─▶ Closed
//! ```
//!
//! The session suspends in three places: the subscribe call, the wait for
//! the next backplane message and the frame write/flush. Each of them is
//! raced against the connection's [`CancellationToken`]. The next message
//! is not pulled until the previous frame has been flushed.
//!
//! A successful subscribe is paired with exactly one unsubscribe. The
//! normal path releases through [`SubscriptionLease::release`]; if the
//! session future is dropped before that (aborted task, panic) the lease's
//! `Drop` schedules the unsubscribe on the current runtime instead.

use std::future::Future;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::sink::{EventSink, sse_headers};
use crate::backplane::{Backplane, MessageStream, Subscription};
use crate::domain::{BackplaneMessage, Channel, SubscriberId};
use crate::error::{SinkError, StreamError};

/// Lifecycle of a [`StreamingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet subscribed.
    Idle,
    /// Subscription acquired, headers committed.
    Subscribed,
    /// Initial-state frame written.
    InitialStateSent,
    /// Forwarding backplane messages.
    Streaming,
    /// Releasing the subscription.
    Closing,
    /// Terminal.
    Closed,
}

/// Why a session stopped without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The backplane closed the message source.
    SourceExhausted,
    /// The connection's cancellation token fired.
    Cancelled,
    /// Writing to the client failed.
    ClientGone,
}

/// Summary returned by a session that ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// How the session ended.
    pub end: SessionEnd,
    /// Frames written and handed to the sink, initial state included.
    pub frames_written: u64,
}

/// Per-entry-point behaviour plugged into a session.
pub trait StreamPlan: Send {
    /// Produces the encoded initial-state payload, if the plan has one.
    ///
    /// Called once, after headers are committed and before any backplane
    /// message is consumed.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] if the state cannot be produced or encoded.
    fn initial_frame(
        &mut self,
    ) -> impl Future<Output = Result<Option<String>, StreamError>> + Send;

    /// Encodes one backplane message, or returns `Ok(None)` to skip it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Encode`] if the message cannot be encoded.
    fn encode(&self, message: &BackplaneMessage) -> Result<Option<String>, StreamError>;
}

/// Releases a subscription exactly once.
#[derive(Debug)]
pub(crate) struct SubscriptionLease<B: Backplane> {
    backplane: B,
    channel: Channel,
    subscriber_id: SubscriberId,
    released: bool,
}

impl<B: Backplane> SubscriptionLease<B> {
    pub(crate) fn new(backplane: B, channel: Channel, subscriber_id: SubscriberId) -> Self {
        Self {
            backplane,
            channel,
            subscriber_id,
            released: false,
        }
    }

    /// Unsubscribes now. Failures are logged and swallowed.
    ///
    /// The lease only counts as released once the backplane call has
    /// returned; if this future is dropped first, `Drop` unsubscribes again.
    pub(crate) async fn release(mut self) {
        unsubscribe(&self.backplane, &self.channel, self.subscriber_id).await;
        self.released = true;
    }
}

impl<B: Backplane> Drop for SubscriptionLease<B> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let backplane = self.backplane.clone();
        let channel = self.channel.clone();
        let subscriber_id = self.subscriber_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(
                    channel = %channel,
                    subscriber_id = %subscriber_id,
                    "releasing abandoned subscription"
                );
                handle.spawn(async move {
                    unsubscribe(&backplane, &channel, subscriber_id).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    channel = %channel,
                    subscriber_id = %subscriber_id,
                    "no runtime to release subscription"
                );
            }
        }
    }
}

async fn unsubscribe<B: Backplane>(
    backplane: &B,
    channel: &Channel,
    subscriber_id: SubscriberId,
) {
    if let Err(err) = backplane.unsubscribe(channel, subscriber_id).await {
        tracing::warn!(
            channel = %channel,
            subscriber_id = %subscriber_id,
            error = %err,
            "unsubscribe failed"
        );
    }
}

/// State machine bridging one backplane subscription to one client sink.
#[derive(Debug)]
pub struct StreamingSession<B, S> {
    backplane: B,
    channel: Channel,
    sink: S,
    state: SessionState,
    frames_written: u64,
}

impl<B: Backplane, S: EventSink> StreamingSession<B, S> {
    /// Creates an idle session for `channel` writing to `sink`.
    #[must_use]
    pub fn new(backplane: B, channel: Channel, sink: S) -> Self {
        Self {
            backplane,
            channel,
            sink,
            state: SessionState::Idle,
            frames_written: 0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Channel this session streams.
    #[must_use]
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Sink this session writes to.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Drives the session to [`SessionState::Closed`].
    ///
    /// # Errors
    ///
    /// - [`StreamError::Subscribe`] if the backplane rejected the subscribe;
    ///   nothing has been written to the sink.
    /// - [`StreamError::InitialState`] or [`StreamError::Encode`] if a frame
    ///   could not be produced; the subscription has been released.
    pub async fn run<P: StreamPlan>(
        &mut self,
        mut plan: P,
        cancel: &CancellationToken,
    ) -> Result<SessionReport, StreamError> {
        let subscribed = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.backplane.subscribe(&self.channel) => Some(result),
        };

        let subscription = match subscribed {
            None => {
                tracing::debug!(channel = %self.channel, "cancelled before subscribing");
                self.close();
                return Ok(self.report(SessionEnd::Cancelled));
            }
            Some(Err(err)) => {
                tracing::warn!(channel = %self.channel, error = %err, "subscribe failed");
                self.close();
                return Err(err.into());
            }
            Some(Ok(subscription)) => subscription,
        };

        let Subscription {
            subscriber_id,
            messages,
            ..
        } = subscription;
        let lease =
            SubscriptionLease::new(self.backplane.clone(), self.channel.clone(), subscriber_id);
        self.transition(SessionState::Subscribed);

        let outcome = self.stream(&mut plan, messages, cancel).await;

        self.transition(SessionState::Closing);
        lease.release().await;
        self.transition(SessionState::Closed);

        match outcome {
            Ok(end) => {
                tracing::info!(
                    channel = %self.channel,
                    subscriber_id = %subscriber_id,
                    frames = self.frames_written,
                    end = ?end,
                    "stream closed"
                );
                Ok(self.report(end))
            }
            Err(err) => {
                tracing::error!(
                    channel = %self.channel,
                    subscriber_id = %subscriber_id,
                    frames = self.frames_written,
                    error = %err,
                    "stream aborted"
                );
                Err(err)
            }
        }
    }

    async fn stream<P: StreamPlan>(
        &mut self,
        plan: &mut P,
        mut messages: MessageStream,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, StreamError> {
        if cancel.is_cancelled() {
            return Ok(SessionEnd::Cancelled);
        }
        if let Err(err) = self.sink.send_headers(sse_headers()).await {
            tracing::debug!(channel = %self.channel, error = %err, "could not commit headers");
            return Ok(SessionEnd::ClientGone);
        }

        let initial = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = plan.initial_frame() => Some(result),
        };
        let Some(initial) = initial else {
            return Ok(SessionEnd::Cancelled);
        };
        if let Some(json) = initial? {
            if let Some(end) = self.emit(json, cancel).await {
                return Ok(end);
            }
            self.transition(SessionState::InitialStateSent);
        }

        self.transition(SessionState::Streaming);
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                message = messages.next() => Some(message),
            };
            let Some(next) = next else {
                return Ok(SessionEnd::Cancelled);
            };
            let Some(message) = next else {
                return Ok(SessionEnd::SourceExhausted);
            };
            let Some(json) = plan.encode(&message)? else {
                continue;
            };
            if let Some(end) = self.emit(json, cancel).await {
                return Ok(end);
            }
        }
    }

    /// Writes and flushes one frame. Returns `Some` if the session must end.
    async fn emit(&mut self, json: String, cancel: &CancellationToken) -> Option<SessionEnd> {
        if cancel.is_cancelled() {
            return Some(SessionEnd::Cancelled);
        }

        let written = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.sink.write_data(json) => Some(result),
        };
        if let Some(end) = self.sink_outcome(written) {
            return Some(end);
        }
        self.frames_written += 1;

        let flushed = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.sink.flush() => Some(result),
        };
        self.sink_outcome(flushed)
    }

    fn sink_outcome(&self, result: Option<Result<(), SinkError>>) -> Option<SessionEnd> {
        match result {
            None => Some(SessionEnd::Cancelled),
            Some(Err(err)) => {
                tracing::debug!(channel = %self.channel, error = %err, "client write failed");
                Some(SessionEnd::ClientGone)
            }
            Some(Ok(())) => None,
        }
    }

    fn close(&mut self) {
        self.transition(SessionState::Closing);
        self.transition(SessionState::Closed);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(
            channel = %self.channel,
            from = ?self.state,
            to = ?next,
            "session transition"
        );
        self.state = next;
    }

    const fn report(&self, end: SessionEnd) -> SessionReport {
        SessionReport {
            end,
            frames_written: self.frames_written,
        }
    }
}
