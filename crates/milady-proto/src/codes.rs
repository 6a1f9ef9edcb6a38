//! Error codes carried in `res` frames and in locally synthesized results.

/// No transport is open, or the handshake has not completed.
pub const NOT_CONNECTED: &str = "NOT_CONNECTED";

/// The request timer elapsed before a response arrived.
pub const TIMEOUT: &str = "TIMEOUT";

/// The connection closed while the request was outstanding.
pub const CONNECTION_CLOSED: &str = "CONNECTION_CLOSED";

/// The gateway refused the `connect` handshake without giving a code.
pub const HANDSHAKE_REJECTED: &str = "HANDSHAKE_REJECTED";

/// The gateway accepted the handshake but the hello payload was unusable.
pub const INVALID_HELLO: &str = "INVALID_HELLO";

/// The request could not be encoded.
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

/// The response payload did not match the expected shape.
pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";

/// The gateway answered `ok: false` without an error object.
pub const UNKNOWN: &str = "UNKNOWN";
