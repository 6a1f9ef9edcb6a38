//! Outcome of a gateway call.

use milady_proto::{ErrorShape, ResponseFrame, codes};
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;

/// Settled result of a request. Failures are data, never a Rust error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResult {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl RpcResult {
    /// A successful result.
    #[must_use]
    pub fn success(payload: Option<Value>) -> Self {
        Self {
            ok: true,
            payload,
            error: None,
        }
    }

    /// A failed result.
    #[must_use]
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: None,
            error: Some(ErrorShape::new(code, message)),
        }
    }

    /// A failed result for a local error.
    #[must_use]
    pub fn from_error(err: &GatewayError) -> Self {
        Self::failure(err.code(), err.to_string())
    }

    /// The failure code, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

impl From<ResponseFrame> for RpcResult {
    fn from(frame: ResponseFrame) -> Self {
        let error = if frame.ok {
            frame.error
        } else {
            Some(
                frame
                    .error
                    .unwrap_or_else(|| ErrorShape::new(codes::UNKNOWN, "request failed")),
            )
        };
        Self {
            ok: frame.ok,
            payload: frame.payload,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_success_frame() {
        let result = RpcResult::from(ResponseFrame::success("1", json!({"a": 1})));
        assert!(result.ok);
        assert_eq!(result.payload, Some(json!({"a": 1})));
        assert!(result.error_code().is_none());
    }

    #[test]
    fn test_failure_without_error_object_gets_unknown_code() {
        let frame = ResponseFrame {
            id: "1".into(),
            ok: false,
            payload: None,
            error: None,
        };
        let result = RpcResult::from(frame);
        assert!(!result.ok);
        assert_eq!(result.error_code(), Some("UNKNOWN"));
    }

    #[test]
    fn test_from_local_error() {
        let result = RpcResult::from_error(&GatewayError::NotConnected);
        assert!(!result.ok);
        assert_eq!(result.error_code(), Some("NOT_CONNECTED"));
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let value = serde_json::to_value(RpcResult::failure("TIMEOUT", "request timed out"))
            .expect("encode");
        assert_eq!(
            value,
            json!({"ok": false, "error": {"code": "TIMEOUT", "message": "request timed out"}})
        );
    }
}
