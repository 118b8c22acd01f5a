//! Messages carried by the backplane.
//!
//! A [`BackplaneMessage`] is a JSON payload with an optional type tag. The
//! payload shape belongs to the publisher and is forwarded untouched by
//! untyped streams. Typed streams keep only messages whose tag equals the
//! expected [`EventName`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::EventName;

/// A single message published to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackplaneMessage {
    /// Declared event type, if the publisher tagged the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Publisher-defined JSON body.
    pub payload: serde_json::Value,
}

impl BackplaneMessage {
    /// Wraps a raw payload without a type tag.
    #[must_use]
    pub fn untyped(payload: serde_json::Value) -> Self {
        Self {
            event_type: None,
            payload,
        }
    }

    /// Serializes `event` and tags it with `T::event_name()`.
    ///
    /// # Errors
    ///
    /// Returns the serde error if `event` cannot be represented as JSON.
    pub fn typed<T: EventName + Serialize>(event: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: Some(T::event_name().to_string()),
            payload: serde_json::to_value(event)?,
        })
    }

    /// Returns `true` if the message is tagged as `T`.
    #[must_use]
    pub fn matches<T: EventName + ?Sized>(&self) -> bool {
        self.event_type.as_deref() == Some(T::event_name())
    }

    /// Decodes the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the payload does not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}
