//! Domain layer: channel naming, subscriber identity and message shape.
//!
//! These types form the naming contract between producers and consumers
//! of the backplane and must stay stable on both sides.

pub mod channel;
pub mod message;
pub mod subscriber_id;

pub use channel::{BROADCAST_IDENTIFIER, Channel, DELIMITER, EventName};
pub use message::BackplaneMessage;
pub use subscriber_id::SubscriberId;
