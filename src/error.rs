//! Error types for the backplane, the response sink and streaming sessions,
//! plus the HTTP-facing [`RelayError`] with status code mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Failure reported by a [`crate::backplane::Backplane`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackplaneError {
    /// The backplane cannot accept requests right now.
    #[error("backplane unavailable: {0}")]
    Unavailable(String),

    /// The channel name was rejected.
    #[error("invalid channel: {0}")]
    InvalidChannel(String),
}

/// Failure writing to the client side of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The client went away or the transport was closed.
    #[error("client disconnected")]
    Disconnected,

    /// Response headers were already committed.
    #[error("response headers already sent")]
    HeadersAlreadySent,
}

/// Fatal condition that ended a streaming session.
///
/// Cancellation and client disconnects are not errors; they are reported
/// through [`crate::sse::SessionEnd`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Subscribing failed; nothing was written to the client.
    #[error("subscribe failed: {0}")]
    Subscribe(#[from] BackplaneError),

    /// The initial-state producer failed.
    #[error("initial state unavailable: {0}")]
    InitialState(#[source] anyhow::Error),

    /// A payload could not be encoded as JSON.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "subscribe failed: backplane unavailable: shutting down"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message, including its cause chain.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Validation | 400 Bad Request             |
/// | 3000–3999 | Server     | 500 / 503                   |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The backplane refused the operation.
    #[error(transparent)]
    Backplane(#[from] BackplaneError),

    /// A stream failed before its headers were committed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Backplane(BackplaneError::InvalidChannel(_))
            | Self::Stream(StreamError::Subscribe(BackplaneError::InvalidChannel(_))) => 1002,
            Self::Internal(_) => 3000,
            Self::Backplane(BackplaneError::Unavailable(_))
            | Self::Stream(StreamError::Subscribe(BackplaneError::Unavailable(_))) => 3001,
            Self::Stream(StreamError::InitialState(_)) => 3002,
            Self::Stream(StreamError::Encode(_)) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::Backplane(BackplaneError::InvalidChannel(_))
            | Self::Stream(StreamError::Subscribe(BackplaneError::InvalidChannel(_))) => {
                StatusCode::BAD_REQUEST
            }
            Self::Backplane(BackplaneError::Unavailable(_))
            | Self::Stream(StreamError::Subscribe(BackplaneError::Unavailable(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Stream(StreamError::InitialState(_) | StreamError::Encode(_))
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_backplane_maps_to_503() {
        let err = RelayError::from(StreamError::from(BackplaneError::Unavailable(
            "down".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn invalid_channel_maps_to_400() {
        let err = RelayError::from(BackplaneError::InvalidChannel(":".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1002);
    }

    #[test]
    fn message_includes_cause() {
        let err = RelayError::from(StreamError::InitialState(anyhow::anyhow!("no snapshot")));
        assert_eq!(err.to_string(), "initial state unavailable: no snapshot");
    }

    #[test]
    fn body_carries_code_and_message_only() {
        let body = ErrorResponse {
            error: ErrorBody {
                code: 1001,
                message: "invalid request: bad".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&body).ok(),
            Some(serde_json::json!({
                "error": { "code": 1001, "message": "invalid request: bad" }
            }))
        );
    }

    #[test]
    fn into_response_sets_status() {
        let response = RelayError::InvalidRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
