//! JSON frames exchanged over the gateway socket.
//!
//! Every socket message carries exactly one frame, discriminated by its
//! `type` field: `req` for calls, `res` for their answers and `event` for
//! server pushes.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ProtoError;

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// A call issued by the client.
    #[serde(rename = "req")]
    Request(RequestFrame),
    /// The answer to a previous call.
    #[serde(rename = "res")]
    Response(ResponseFrame),
    /// A server-pushed event.
    #[serde(rename = "event")]
    Event(EventFrame),
}

impl Frame {
    /// Serialize to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a frame of a known type.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }

    /// The wire name of this frame's type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "req",
            Self::Response(_) => "res",
            Self::Event(_) => "event",
        }
    }
}

/// `{"type":"req","id":..,"method":..,"params":..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Correlation id, a UUID v4 string.
    pub id: String,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl RequestFrame {
    /// Create a request with a fresh correlation id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }
}

/// `{"type":"res","id":..,"ok":..,"payload":..,"error":..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Id of the request being answered.
    pub id: String,
    /// Whether the call succeeded.
    #[serde(default)]
    pub ok: bool,
    /// Result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResponseFrame {
    /// A successful response.
    #[must_use]
    pub fn success(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failure(
        id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(ErrorShape::new(code, message)),
        }
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    /// Machine-readable code. Numeric codes are stringified on input.
    #[serde(default, deserialize_with = "code_from_any")]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl ErrorShape {
    /// Create an error object.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

fn code_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(code) => Ok(code),
        Value::Number(code) => Ok(code.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("invalid error code: {other}"))),
    }
}

/// `{"type":"event","event":..,"payload":..,"seq":..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Event name.
    pub event: String,
    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Server sequence number, when the server numbers its events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl EventFrame {
    /// Create an event frame.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: Option<Value>, seq: Option<u64>) -> Self {
        Self {
            event: event.into(),
            payload,
            seq,
        }
    }
}
