//! Error types for the ARP SDK.
//!
//! Two taxa of failure flow through the crate. *Protocol errors* (admission
//! rejections, unknown methods, uninitialized sessions, parse failures) become
//! JSON-RPC error objects on the wire. *Tool-domain errors* (a handler that
//! raised) are packaged into a normal `CallToolResult` with `state: failed` --
//! the robot tried and failed, which is an outcome, not a transport problem.

use serde_json::Value;
use std::fmt;
use thiserror::Error as ThisError;

/// Result type alias used throughout the SDK.
pub type Result<T> = std::result::Result<T, Error>;

/// A JSON-RPC error code.
///
/// Standard JSON-RPC codes plus the ARP-specific range below -40000.
///
/// # Examples
///
/// ```rust
/// use arp_sdk::error::ErrorCode;
///
/// assert_eq!(ErrorCode::SAFETY_VIOLATION.as_i32(), -40001);
/// assert_eq!(ErrorCode::PARSE_ERROR.as_i32(), -32700);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: Self = Self(-32700);
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: Self = Self(-32600);
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: Self = Self(-32601);
    /// Invalid method parameters.
    pub const INVALID_PARAMS: Self = Self(-32602);
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: Self = Self(-32603);

    /// A safety constraint rejected the invocation.
    pub const SAFETY_VIOLATION: Self = Self(-40001);
    /// A declared tool precondition does not hold.
    pub const PRECONDITION_FAILED: Self = Self(-40002);
    /// The named tool is not registered.
    pub const TOOL_NOT_FOUND: Self = Self(-40003);
    /// The supplied call id is already running.
    pub const TOOL_BUSY: Self = Self(-40004);
    /// A confirmation request timed out.
    pub const CONFIRMATION_TIMEOUT: Self = Self(-40005);
    /// A confirmation request was denied.
    pub const CONFIRMATION_DENIED: Self = Self(-40006);
    /// The sticky emergency-stop latch is set.
    pub const EMERGENCY_STOPPED: Self = Self(-40007);
    /// The named context source is not registered.
    pub const CONTEXT_NOT_FOUND: Self = Self(-40008);
    /// The session has not completed `arp.initialize`.
    pub const NOT_INITIALIZED: Self = Self(-40009);

    /// Get the raw integer code.
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport-level errors.
#[derive(Debug, ThisError)]
pub enum TransportError {
    /// I/O failure on the underlying socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection is closed; pending requests fail with this.
    #[error("connection closed")]
    ConnectionClosed,

    /// A frame could not be parsed or serialized.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// WebSocket protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The requested operation needs a live connection.
    #[error("not connected")]
    NotConnected,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::ConnectionClosed,
            WsError::Io(e) => Self::Io(e),
            other => Self::WebSocket(other.to_string()),
        }
    }
}

/// The SDK error type.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A protocol-level failure, surfaced to the peer as a JSON-RPC error
    /// object with the given code.
    #[error("protocol error {code}: {message}")]
    Protocol {
        /// JSON-RPC / ARP error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
        /// Optional structured detail attached to the error object.
        data: Option<Value>,
    },

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// Tool handler failure. This is a tool-domain outcome: the invocation
    /// engine packages it into a `failed` result rather than a wire error.
    #[error("{0}")]
    Handler(String),
}

impl Error {
    /// Create a protocol error with the given code.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arp_sdk::error::{Error, ErrorCode};
    ///
    /// let err = Error::protocol(ErrorCode::TOOL_NOT_FOUND, "Tool not found: warp_drive");
    /// assert_eq!(err.code(), Some(ErrorCode::TOOL_NOT_FOUND));
    /// ```
    pub fn protocol(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a protocol error carrying structured data.
    pub fn protocol_with_data(code: ErrorCode, message: impl Into<String>, data: Value) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a tool-domain handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Create a parse error (code -32700).
    pub fn parse(message: impl Into<String>) -> Self {
        Self::protocol(ErrorCode::PARSE_ERROR, message)
    }

    /// Create a method-not-found error (code -32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::protocol(
            ErrorCode::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    /// The JSON-RPC code this error maps to, if it is a protocol error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Structured data attached to a protocol error.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Protocol { data, .. } => data.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arp_error_codes() {
        assert_eq!(ErrorCode::SAFETY_VIOLATION.as_i32(), -40001);
        assert_eq!(ErrorCode::PRECONDITION_FAILED.as_i32(), -40002);
        assert_eq!(ErrorCode::TOOL_NOT_FOUND.as_i32(), -40003);
        assert_eq!(ErrorCode::TOOL_BUSY.as_i32(), -40004);
        assert_eq!(ErrorCode::CONFIRMATION_TIMEOUT.as_i32(), -40005);
        assert_eq!(ErrorCode::CONFIRMATION_DENIED.as_i32(), -40006);
        assert_eq!(ErrorCode::EMERGENCY_STOPPED.as_i32(), -40007);
        assert_eq!(ErrorCode::CONTEXT_NOT_FOUND.as_i32(), -40008);
        assert_eq!(ErrorCode::NOT_INITIALIZED.as_i32(), -40009);
    }

    #[test]
    fn protocol_error_carries_data() {
        let err = Error::protocol_with_data(
            ErrorCode::SAFETY_VIOLATION,
            "Safety violation: velocity",
            serde_json::json!({"constraint": "velocity"}),
        );
        assert_eq!(err.code(), Some(ErrorCode::SAFETY_VIOLATION));
        assert_eq!(
            err.data().and_then(|d| d.get("constraint")),
            Some(&serde_json::json!("velocity"))
        );
    }

    #[test]
    fn transport_error_display() {
        let err = Error::from(TransportError::ConnectionClosed);
        assert_eq!(err.to_string(), "connection closed");
        assert_eq!(err.code(), None);
    }

    #[test]
    fn method_not_found_message() {
        let err = Error::method_not_found("arp.teleport");
        assert_eq!(err.code(), Some(ErrorCode::METHOD_NOT_FOUND));
        assert!(err.to_string().contains("arp.teleport"));
    }
}
