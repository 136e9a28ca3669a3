//! The `{success, message, data}` envelope used by WorldMap and by our own
//! AJAX responses.

use serde_json::Value;

use crate::prelude::*;

/// A JSON response envelope.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JsonMessage {
    /// Did the operation work?
    pub success: bool,
    /// A human-readable description of what happened.
    #[serde(default)]
    pub message: String,
    /// Extra data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonMessage {
    /// A successful response carrying `data`.
    pub fn success<S: Into<String>>(message: S, data: Option<Value>) -> JsonMessage {
        JsonMessage {
            success: true,
            message: message.into(),
            data,
        }
    }

    /// A failed response.
    pub fn error<S: Into<String>>(message: S) -> JsonMessage {
        JsonMessage {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// A failed response with extra data, such as form errors.
    pub fn error_with_data<S: Into<String>>(message: S, data: Value) -> JsonMessage {
        JsonMessage {
            success: false,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse an envelope from a response body.
    pub fn from_json_str(body: &str) -> Result<JsonMessage> {
        serde_json::from_str(body).context("could not parse JSON message")
    }
}

#[test]
fn envelopes_parse_with_missing_fields() {
    let msg = JsonMessage::from_json_str(r#"{"success": false}"#).unwrap();
    assert_eq!(msg, JsonMessage::error(""));

    let msg =
        JsonMessage::from_json_str(r#"{"success": true, "message": "ok", "data": {"a": 1}}"#)
            .unwrap();
    assert!(msg.success);
    assert_eq!(msg.data.unwrap()["a"], 1);

    assert!(JsonMessage::from_json_str("<html>").is_err());
}

#[test]
fn empty_data_is_not_serialized() {
    let json = serde_json::to_string(&JsonMessage::error("nope")).unwrap();
    assert_eq!(json, r#"{"success":false,"message":"nope"}"#);
}
