//! JSON encoding of stream payloads.
//!
//! Ordinary messages are encoded as-is; only the initial-state frame is
//! wrapped in an [`Envelope`]. Compact JSON never contains a raw newline,
//! so every encoded payload fits a single `data:` line.

use serde::Serialize;

/// Tagged wrapper used for the initial-state frame.
///
/// Serializes as `{"Type": "<event name>", "Data": <state>}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a, T> {
    /// Event name announced to the client.
    #[serde(rename = "Type")]
    pub event_type: &'a str,
    /// Initial state payload.
    #[serde(rename = "Data")]
    pub data: &'a T,
}

/// Encodes `state` inside an [`Envelope`] named `event_name`.
///
/// # Errors
///
/// Returns the serde error if `state` is not serializable; no partial
/// output is produced in that case.
pub fn encode_initial_state<T: Serialize>(
    event_name: &str,
    state: &T,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        event_type: event_name,
        data: state,
    })
}

/// Encodes a payload without any wrapping.
///
/// # Errors
///
/// Returns the serde error if `payload` is not serializable.
pub fn encode_payload<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(payload)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn initial_state_layout() {
        let Ok(json) = encode_initial_state("game_state", &json!({ "score": 0 })) else {
            panic!("json values always encode");
        };
        assert_eq!(json, r#"{"Type":"game_state","Data":{"score":0}}"#);
    }

    #[test]
    fn payload_is_not_wrapped() {
        let Ok(json) = encode_payload(&json!({ "x": 1 })) else {
            panic!("json values always encode");
        };
        assert_eq!(json, r#"{"x":1}"#);
    }

    #[test]
    fn embedded_newlines_stay_escaped() {
        let Ok(json) = encode_payload(&json!({ "text": "a\nb" })) else {
            panic!("json values always encode");
        };
        assert!(!json.contains('\n'));
        assert!(json.contains("\\n"));
    }

    #[test]
    fn non_string_map_keys_fail_to_encode() {
        let mut state = BTreeMap::new();
        state.insert((1, 2), "pair");
        assert!(encode_initial_state("bad", &state).is_err());
    }
}
