//! Channel naming rules shared by publishers and subscribers.
//!
//! A [`Channel`] is the topic string both sides of the backplane agree on.
//! It is built from a `domain`, an `identifier` and an optional event type,
//! joined by [`DELIMITER`]:
//!
//! ```text
//! game:abc123              Channel::new("game", "abc123")
//! game:abc123:ScoreChanged Channel::for_event::<ScoreChanged>("game", "abc123")
//! game:all                 Channel::broadcast("game")
//! ```
//!
//! No escaping is performed. Components must be non-empty and must not
//! contain the delimiter; keeping them that way is the caller's job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator placed between channel components.
pub const DELIMITER: char = ':';

/// Reserved identifier meaning "every identifier in this domain".
pub const BROADCAST_IDENTIFIER: &str = "all";

/// Canonical name of an event type, used as the third channel component
/// and as the tag on typed backplane messages.
///
/// The default is the short Rust type name (`ScoreChanged` for
/// `my_app::events::ScoreChanged<T>`). Override it to pin a wire name that
/// survives refactors.
pub trait EventName {
    /// Returns the event name for this type.
    fn event_name() -> &'static str {
        short_type_name::<Self>()
    }
}

/// Returns the last path segment of `T`'s type name, without generics.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Publish/subscribe topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    /// `"{domain}:{identifier}"`.
    #[must_use]
    pub fn new(domain: &str, identifier: impl fmt::Display) -> Self {
        Self(format!("{domain}{DELIMITER}{identifier}"))
    }

    /// `"{domain}:{identifier}:{event_type}"`.
    #[must_use]
    pub fn with_event_type(domain: &str, identifier: impl fmt::Display, event_type: &str) -> Self {
        Self(format!(
            "{domain}{DELIMITER}{identifier}{DELIMITER}{event_type}"
        ))
    }

    /// Three-component channel whose event type is `T`'s [`EventName`].
    #[must_use]
    pub fn for_event<T: EventName + ?Sized>(domain: &str, identifier: impl fmt::Display) -> Self {
        Self::with_event_type(domain, identifier, T::event_name())
    }

    /// `"{domain}:all"`.
    #[must_use]
    pub fn broadcast(domain: &str) -> Self {
        Self::new(domain, BROADCAST_IDENTIFIER)
    }

    /// Returns the topic string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no component of the topic is empty.
    ///
    /// Used by backplanes to reject obviously malformed subscriptions.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.split(DELIMITER).count() >= 2 && self.0.split(DELIMITER).all(|c| !c.is_empty())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Channel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}
