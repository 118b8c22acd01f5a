//! In-process backplane.
//!
//! [`InMemoryBackplane`] keeps, per channel, one bounded
//! [`tokio::sync::mpsc`] queue per subscriber. Publishing never waits on a
//! slow subscriber: when a queue is full the message is dropped for that
//! subscriber only and a warning is logged. Delivery is therefore
//! at-most-once, as with any broadcast ring buffer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{Backplane, Subscription};
use crate::domain::{BackplaneMessage, Channel, SubscriberId};
use crate::error::BackplaneError;

type Group = HashMap<SubscriberId, mpsc::Sender<BackplaneMessage>>;

/// Default per-subscriber queue capacity.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Pub/sub engine living inside the current process.
///
/// Cloning yields another handle onto the same groups.
#[derive(Debug, Clone)]
pub struct InMemoryBackplane {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    groups: RwLock<HashMap<Channel, Group>>,
    buffer: usize,
    open: AtomicBool,
}

impl InMemoryBackplane {
    /// Creates a backplane whose subscribers each buffer up to `buffer`
    /// undelivered messages.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                groups: RwLock::new(HashMap::new()),
                buffer: buffer.max(1),
                open: AtomicBool::new(true),
            }),
        }
    }

    /// Returns the number of live subscribers on `channel`.
    pub async fn subscriber_count(&self, channel: &Channel) -> usize {
        self.inner
            .groups
            .read()
            .await
            .get(channel)
            .map_or(0, HashMap::len)
    }

    /// Drops every subscriber of `channel`; their message streams end.
    ///
    /// Returns the number of subscribers removed.
    pub async fn close_channel(&self, channel: &Channel) -> usize {
        let removed = self
            .inner
            .groups
            .write()
            .await
            .remove(channel)
            .map_or(0, |group| group.len());
        tracing::debug!(channel = %channel, removed, "channel closed");
        removed
    }

    /// Stops accepting subscriptions and publishes, and ends every stream.
    pub async fn shutdown(&self) {
        let mut groups = self.inner.groups.write().await;
        self.inner.open.store(false, Ordering::SeqCst);
        let channels = groups.len();
        groups.clear();
        tracing::info!(channels, "in-memory backplane shut down");
    }

    fn ensure_open(&self) -> Result<(), BackplaneError> {
        if self.inner.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackplaneError::Unavailable(
                "in-memory backplane is shut down".to_string(),
            ))
        }
    }
}

impl Default for InMemoryBackplane {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl Backplane for InMemoryBackplane {
    async fn subscribe(&self, channel: &Channel) -> Result<Subscription, BackplaneError> {
        if !channel.is_well_formed() {
            return Err(BackplaneError::InvalidChannel(channel.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let subscriber_id = SubscriberId::new();
        {
            let mut groups = self.inner.groups.write().await;
            self.ensure_open()?;
            groups
                .entry(channel.clone())
                .or_default()
                .insert(subscriber_id, tx);
        }
        tracing::debug!(channel = %channel, subscriber_id = %subscriber_id, "subscribed");

        let messages = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        })
        .boxed();

        Ok(Subscription {
            channel: channel.clone(),
            subscriber_id,
            messages,
        })
    }

    async fn unsubscribe(
        &self,
        channel: &Channel,
        subscriber_id: SubscriberId,
    ) -> Result<(), BackplaneError> {
        let mut groups = self.inner.groups.write().await;
        let removed = groups
            .get_mut(channel)
            .and_then(|group| group.remove(&subscriber_id))
            .is_some();
        if groups.get(channel).is_some_and(HashMap::is_empty) {
            groups.remove(channel);
        }
        tracing::debug!(
            channel = %channel,
            subscriber_id = %subscriber_id,
            removed,
            "unsubscribed"
        );
        Ok(())
    }

    async fn publish_to_group(
        &self,
        channel: &Channel,
        message: BackplaneMessage,
    ) -> Result<usize, BackplaneError> {
        self.ensure_open()?;
        let groups = self.inner.groups.read().await;
        let Some(group) = groups.get(channel) else {
            return Ok(0);
        };

        let mut delivered = 0;
        for (subscriber_id, tx) in group {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        channel = %channel,
                        subscriber_id = %subscriber_id,
                        "subscriber queue full, message dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        channel = %channel,
                        subscriber_id = %subscriber_id,
                        "subscriber stream dropped before unsubscribe"
                    );
                }
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn msg(n: u32) -> BackplaneMessage {
        BackplaneMessage::untyped(json!({ "n": n }))
    }

    #[tokio::test]
    async fn publish_without_subscribers_returns_zero() {
        let bp = InMemoryBackplane::default();
        let delivered = bp.publish_to_group(&Channel::new("game", "a"), msg(1)).await;
        assert_eq!(delivered.ok(), Some(0));
    }

    #[tokio::test]
    async fn subscriber_receives_in_publish_order() {
        let bp = InMemoryBackplane::default();
        let channel = Channel::new("game", "a");
        let Ok(mut sub) = bp.subscribe(&channel).await else {
            panic!("subscribe failed");
        };

        for n in 0..3 {
            assert_ok!(bp.publish_to_group(&channel, msg(n)).await);
        }
        for n in 0..3 {
            assert_eq!(sub.messages.next().await, Some(msg(n)));
        }
    }

    #[tokio::test]
    async fn fan_out_to_every_subscriber_of_the_channel_only() {
        let bp = InMemoryBackplane::default();
        let channel = Channel::new("game", "a");
        let other = Channel::new("game", "b");
        let Ok(mut s1) = bp.subscribe(&channel).await else {
            panic!("subscribe failed");
        };
        let Ok(mut s2) = bp.subscribe(&channel).await else {
            panic!("subscribe failed");
        };
        let Ok(_s3) = bp.subscribe(&other).await else {
            panic!("subscribe failed");
        };
        assert_ne!(s1.subscriber_id, s2.subscriber_id);

        assert_eq!(bp.publish_to_group(&channel, msg(7)).await.ok(), Some(2));
        assert_eq!(s1.messages.next().await, Some(msg(7)));
        assert_eq!(s2.messages.next().await, Some(msg(7)));
    }

    #[tokio::test]
    async fn unsubscribe_ends_stream_and_is_idempotent() {
        let bp = InMemoryBackplane::default();
        let channel = Channel::new("game", "a");
        let Ok(mut sub) = bp.subscribe(&channel).await else {
            panic!("subscribe failed");
        };
        assert_eq!(bp.subscriber_count(&channel).await, 1);

        assert_ok!(bp.unsubscribe(&channel, sub.subscriber_id).await);
        assert_ok!(bp.unsubscribe(&channel, sub.subscriber_id).await);
        assert_eq!(bp.subscriber_count(&channel).await, 0);
        assert!(sub.messages.next().await.is_none());
    }

    #[tokio::test]
    async fn full_queue_drops_for_that_subscriber_only() {
        let bp = InMemoryBackplane::new(1);
        let channel = Channel::new("game", "a");
        let Ok(mut slow) = bp.subscribe(&channel).await else {
            panic!("subscribe failed");
        };

        assert_eq!(bp.publish_to_group(&channel, msg(1)).await.ok(), Some(1));
        assert_eq!(bp.publish_to_group(&channel, msg(2)).await.ok(), Some(0));
        assert_eq!(slow.messages.next().await, Some(msg(1)));
    }

    #[tokio::test]
    async fn close_channel_exhausts_streams() {
        let bp = InMemoryBackplane::default();
        let channel = Channel::new("game", "a");
        let Ok(mut sub) = bp.subscribe(&channel).await else {
            panic!("subscribe failed");
        };
        assert_eq!(bp.close_channel(&channel).await, 1);
        assert!(sub.messages.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_channel_is_rejected() {
        let bp = InMemoryBackplane::default();
        let result = bp.subscribe(&Channel::new("", "a")).await;
        assert!(matches!(result, Err(BackplaneError::InvalidChannel(_))));
    }

    #[tokio::test]
    async fn shutdown_refuses_new_work() {
        let bp = InMemoryBackplane::default();
        let channel = Channel::new("game", "a");
        let Ok(mut sub) = bp.subscribe(&channel).await else {
            panic!("subscribe failed");
        };
        bp.shutdown().await;

        assert!(sub.messages.next().await.is_none());
        assert!(matches!(
            bp.subscribe(&channel).await,
            Err(BackplaneError::Unavailable(_))
        ));
        assert_err!(bp.publish_to_group(&channel, msg(1)).await);
    }
}
