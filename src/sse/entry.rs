//! The three ways to run a streaming session.
//!
//! | Entry point                   | Initial state | Type filter |
//! |-------------------------------|---------------|-------------|
//! | [`stream_events`]             | no            | yes         |
//! | [`stream_with_initial_state`] | yes           | no          |
//! | [`stream_untyped`]            | no            | no          |

use std::future::Future;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::envelope;
use super::session::{SessionReport, StreamPlan, StreamingSession};
use super::sink::EventSink;
use crate::backplane::Backplane;
use crate::domain::{BackplaneMessage, Channel, EventName};
use crate::error::StreamError;

/// Forwards every message payload as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Untyped;

impl StreamPlan for Untyped {
    async fn initial_frame(&mut self) -> Result<Option<String>, StreamError> {
        Ok(None)
    }

    fn encode(&self, message: &BackplaneMessage) -> Result<Option<String>, StreamError> {
        Ok(Some(envelope::encode_payload(&message.payload)?))
    }
}

/// Forwards only messages tagged as `T` whose payload decodes as `T`.
///
/// The payload is forwarded as published, including fields `T` does not
/// declare.
#[derive(Debug)]
pub struct TypedFilter<T> {
    _event: PhantomData<fn() -> T>,
}

impl<T> TypedFilter<T> {
    /// Creates the filter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _event: PhantomData,
        }
    }
}

impl<T> Default for TypedFilter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StreamPlan for TypedFilter<T>
where
    T: EventName + DeserializeOwned,
{
    async fn initial_frame(&mut self) -> Result<Option<String>, StreamError> {
        Ok(None)
    }

    fn encode(&self, message: &BackplaneMessage) -> Result<Option<String>, StreamError> {
        if !message.matches::<T>() {
            return Ok(None);
        }
        match message.decode::<T>() {
            Ok(_) => Ok(Some(envelope::encode_payload(&message.payload)?)),
            Err(err) => {
                tracing::warn!(
                    event_type = T::event_name(),
                    error = %err,
                    "skipping message whose payload does not match its tag"
                );
                Ok(None)
            }
        }
    }
}

/// Sends an enveloped initial state, then forwards every payload as-is.
#[derive(Debug)]
pub struct WithInitialState<F, T> {
    event_name: String,
    producer: Option<F>,
    _state: PhantomData<fn() -> T>,
}

impl<F, T> WithInitialState<F, T> {
    /// Creates the plan. `producer` runs once the stream is established.
    #[must_use]
    pub fn new(event_name: impl Into<String>, producer: F) -> Self {
        Self {
            event_name: event_name.into(),
            producer: Some(producer),
            _state: PhantomData,
        }
    }
}

impl<F, Fut, T> StreamPlan for WithInitialState<F, T>
where
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = anyhow::Result<T>> + Send,
    T: Serialize + Send,
{
    async fn initial_frame(&mut self) -> Result<Option<String>, StreamError> {
        let Some(producer) = self.producer.take() else {
            return Ok(None);
        };
        let state = producer().await.map_err(StreamError::InitialState)?;
        Ok(Some(envelope::encode_initial_state(&self.event_name, &state)?))
    }

    fn encode(&self, message: &BackplaneMessage) -> Result<Option<String>, StreamError> {
        Untyped.encode(message)
    }
}

/// Streams messages of type `T` from `channel`, dropping everything else.
///
/// # Errors
///
/// See [`StreamingSession::run`].
pub async fn stream_events<T, B, S>(
    backplane: B,
    channel: Channel,
    sink: S,
    cancel: &CancellationToken,
) -> Result<SessionReport, StreamError>
where
    T: EventName + DeserializeOwned,
    B: Backplane,
    S: EventSink,
{
    StreamingSession::new(backplane, channel, sink)
        .run(TypedFilter::<T>::new(), cancel)
        .await
}

/// Streams `channel`, preceded by one `{"Type": event_name, "Data": state}`
/// frame built from `producer`.
///
/// If the connection is cancelled while `producer` is still running, the
/// producer future is dropped and no initial frame is written.
///
/// # Errors
///
/// See [`StreamingSession::run`]; a failing producer yields
/// [`StreamError::InitialState`].
pub async fn stream_with_initial_state<T, F, Fut, B, S>(
    backplane: B,
    channel: Channel,
    sink: S,
    event_name: &str,
    producer: F,
    cancel: &CancellationToken,
) -> Result<SessionReport, StreamError>
where
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = anyhow::Result<T>> + Send,
    T: Serialize + Send,
    B: Backplane,
    S: EventSink,
{
    StreamingSession::new(backplane, channel, sink)
        .run(WithInitialState::new(event_name, producer), cancel)
        .await
}

/// Streams every message on `channel`.
///
/// # Errors
///
/// See [`StreamingSession::run`].
pub async fn stream_untyped<B, S>(
    backplane: B,
    channel: Channel,
    sink: S,
    cancel: &CancellationToken,
) -> Result<SessionReport, StreamError>
where
    B: Backplane,
    S: EventSink,
{
    StreamingSession::new(backplane, channel, sink)
        .run(Untyped, cancel)
        .await
}
