//! Path parameters shared by stream and publish endpoints.

use serde::Deserialize;

use crate::domain::{Channel, DELIMITER};
use crate::error::RelayError;

/// `{domain}/{identifier}` path segment pair.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPath {
    /// Channel domain.
    pub domain: String,
    /// Identifier within the domain.
    pub identifier: String,
}

/// `{domain}/{identifier}/{event_type}` path segments.
#[derive(Debug, Clone, Deserialize)]
pub struct TypedChannelPath {
    /// Channel domain.
    pub domain: String,
    /// Identifier within the domain.
    pub identifier: String,
    /// Event type component.
    pub event_type: String,
}

impl ChannelPath {
    /// Validates the components and builds `domain:identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] if a component is empty or
    /// contains the channel delimiter.
    pub fn channel(&self) -> Result<Channel, RelayError> {
        validate_component("domain", &self.domain)?;
        validate_component("identifier", &self.identifier)?;
        Ok(Channel::new(&self.domain, &self.identifier))
    }
}

impl TypedChannelPath {
    /// Validates the components and builds `domain:identifier:event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] if a component is empty or
    /// contains the channel delimiter.
    pub fn channel(&self) -> Result<Channel, RelayError> {
        validate_component("domain", &self.domain)?;
        validate_component("identifier", &self.identifier)?;
        validate_component("event_type", &self.event_type)?;
        Ok(Channel::with_event_type(
            &self.domain,
            &self.identifier,
            &self.event_type,
        ))
    }
}

fn validate_component(name: &str, value: &str) -> Result<(), RelayError> {
    if value.is_empty() {
        return Err(RelayError::InvalidRequest(format!("{name} must not be empty")));
    }
    if value.contains(DELIMITER) {
        return Err(RelayError::InvalidRequest(format!(
            "{name} must not contain '{DELIMITER}'"
        )));
    }
    Ok(())
}
