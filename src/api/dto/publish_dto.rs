//! Publish request and response bodies.

use serde::{Deserialize, Serialize};

use crate::domain::{BackplaneMessage, Channel};

/// `POST /api/v1/publish/...` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Optional tag matched by typed streams.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Message body forwarded verbatim to untyped streams.
    pub payload: serde_json::Value,
}

impl From<PublishRequest> for BackplaneMessage {
    fn from(req: PublishRequest) -> Self {
        Self {
            event_type: req.event_type,
            payload: req.payload,
        }
    }
}

/// `POST /api/v1/publish/...` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Channel the message was published to.
    pub channel: Channel,
    /// Number of subscribers the message was handed to.
    pub delivered: usize,
}
