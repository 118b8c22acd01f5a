//! Publish/subscribe backplane contract.
//!
//! The streaming core only ever talks to a [`Backplane`]: it subscribes to a
//! [`Channel`], drains the returned [`Subscription`] and hands the
//! subscriber identity back on `unsubscribe`. [`InMemoryBackplane`] is the
//! in-process implementation used by the binary and the tests; networked
//! backplanes implement the same trait.

pub mod memory;

use std::fmt;
use std::future::Future;

use futures_util::stream::BoxStream;

use crate::domain::{BackplaneMessage, Channel, SubscriberId};
use crate::error::BackplaneError;

pub use memory::InMemoryBackplane;

/// Lazy, possibly infinite, non-restartable sequence of channel messages.
pub type MessageStream = BoxStream<'static, BackplaneMessage>;

/// Live binding between one streaming session and one channel.
pub struct Subscription {
    /// Channel this subscription listens on.
    pub channel: Channel,
    /// Identity to pass back to [`Backplane::unsubscribe`].
    pub subscriber_id: SubscriberId,
    /// Messages published to the channel after the subscribe call.
    pub messages: MessageStream,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("subscriber_id", &self.subscriber_id)
            .finish_non_exhaustive()
    }
}

/// Publish/subscribe substrate.
///
/// Handles are cheap to clone and shared across connections. Delivery is
/// whatever the implementation provides; nothing above this trait retries.
pub trait Backplane: Clone + Send + Sync + 'static {
    /// Registers interest in `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`BackplaneError`] if the backplane is unreachable or the
    /// channel is rejected.
    fn subscribe(
        &self,
        channel: &Channel,
    ) -> impl Future<Output = Result<Subscription, BackplaneError>> + Send;

    /// Releases a subscription. Unknown identities are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BackplaneError`] if the release could not be delivered.
    fn unsubscribe(
        &self,
        channel: &Channel,
        subscriber_id: SubscriberId,
    ) -> impl Future<Output = Result<(), BackplaneError>> + Send;

    /// Fans `message` out to every current subscriber of `channel`.
    ///
    /// Returns the number of subscribers the message was handed to.
    ///
    /// # Errors
    ///
    /// Returns [`BackplaneError`] if the backplane is unreachable.
    fn publish_to_group(
        &self,
        channel: &Channel,
        message: BackplaneMessage,
    ) -> impl Future<Output = Result<usize, BackplaneError>> + Send;
}
