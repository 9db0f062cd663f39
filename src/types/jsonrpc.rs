//! JSON-RPC 2.0 message types.
//!
//! Every ARP frame is a single JSON object carrying `"jsonrpc": "2.0"`.
//! The three shapes are distinguished purely structurally: a request has
//! `id` and `method`, a notification has `method` without `id`, and a
//! response has `id` with exactly one of `result` or `error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;

/// The JSON-RPC protocol version string present on every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// A request identifier: integer or string.
///
/// The client allocates monotonically increasing integers; servers echo the
/// id back verbatim, so string ids from other implementations round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(i64),
    /// String id.
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A JSON-RPC request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id echoed on the response.
    pub id: RequestId,
    /// Method name, e.g. `"arp.callTool"`.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl JSONRPCRequest {
    /// Create a request frame.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification frame (no id, no response).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCNotification {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Method name, e.g. `"arp.contextUpdate"`.
    pub method: String,
    /// Notification parameters.
    #[serde(default)]
    pub params: Value,
}

impl JSONRPCNotification {
    /// Create a notification frame.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCError {
    /// Integer error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JSONRPCError {
    /// Create an error object from a typed code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_i32(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The result-or-error payload of a response.
///
/// Exactly one of the two fields appears on the wire; `error` is tried
/// first when deserializing so a response can never be read as both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// Failure payload.
    Error {
        /// The error object.
        error: JSONRPCError,
    },
    /// Success payload.
    Result {
        /// The method result value.
        result: Value,
    },
}

/// A JSON-RPC response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The id of the request being answered.
    pub id: RequestId,
    /// Result or error.
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl JSONRPCResponse {
    /// Create a success response.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arp_sdk::types::JSONRPCResponse;
    ///
    /// let resp = JSONRPCResponse::success(1i64, serde_json::json!({"status": "ok"}));
    /// assert!(resp.result().is_some());
    /// assert!(resp.error().is_none());
    /// ```
    pub fn success(id: impl Into<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            payload: ResponsePayload::Result { result },
        }
    }

    /// Create an error response.
    pub fn failure(id: impl Into<RequestId>, error: JSONRPCError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            payload: ResponsePayload::Error { error },
        }
    }

    /// The result value, if this is a success response.
    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result { result } => Some(result),
            ResponsePayload::Error { .. } => None,
        }
    }

    /// The error object, if this is an error response.
    pub fn error(&self) -> Option<&JSONRPCError> {
        match &self.payload {
            ResponsePayload::Error { error } => Some(error),
            ResponsePayload::Result { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_roundtrip() {
        let req = JSONRPCRequest::new(7i64, "arp.listTools", json!({}));
        let text = serde_json::to_string(&req).unwrap();
        assert!(text.contains("\"jsonrpc\":\"2.0\""));
        let back: JSONRPCRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn response_success_shape() {
        let resp = JSONRPCResponse::success(3i64, json!({"tools": []}));
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("result").is_some());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn response_error_shape() {
        let resp = JSONRPCResponse::failure(
            4i64,
            JSONRPCError::new(ErrorCode::TOOL_NOT_FOUND, "Tool not found: x"),
        );
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("error").is_some());
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], json!(-40003));
    }

    #[test]
    fn response_deserializes_error_payload() {
        let text = r#"{"jsonrpc":"2.0","id":9,"error":{"code":-40009,"message":"Not initialized"}}"#;
        let resp: JSONRPCResponse = serde_json::from_str(text).unwrap();
        let err = resp.error().expect("error payload");
        assert_eq!(err.code, -40009);
        assert!(resp.result().is_none());
    }

    #[test]
    fn response_deserializes_null_result() {
        let text = r#"{"jsonrpc":"2.0","id":"abc","result":null}"#;
        let resp: JSONRPCResponse = serde_json::from_str(text).unwrap();
        assert_eq!(resp.result(), Some(&Value::Null));
        assert_eq!(resp.id, RequestId::from("abc"));
    }

    #[test]
    fn string_and_numeric_ids() {
        let n: RequestId = serde_json::from_str("42").unwrap();
        assert_eq!(n, RequestId::Number(42));
        let s: RequestId = serde_json::from_str("\"call-1\"").unwrap();
        assert_eq!(s, RequestId::String("call-1".to_string()));
    }
}
