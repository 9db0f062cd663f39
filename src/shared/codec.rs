//! Wire codec for framed JSON-RPC messages.
//!
//! Every frame is one JSON object carrying `"jsonrpc": "2.0"`. Frames are
//! classified purely by shape: `id` + `method` is a request, `method`
//! without `id` is a notification, and `id` with `result` or `error` is a
//! response. Nothing else is a valid frame.

use crate::error::{ErrorCode, Result, TransportError};
use crate::types::{JSONRPCError, JSONRPCNotification, JSONRPCRequest, JSONRPCResponse};
use serde::Serialize;

/// A decoded wire frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A request: carries an id and expects a response.
    Request(JSONRPCRequest),
    /// A notification: fire-and-forget.
    Notification(JSONRPCNotification),
    /// A response to an earlier request.
    Response(JSONRPCResponse),
}

/// Parse one text frame and classify it by shape.
///
/// # Errors
///
/// Returns [`TransportError::InvalidMessage`] for malformed JSON or a JSON
/// object that matches none of the three shapes. What to do with that is
/// the caller's policy: the server answers with a parse error, the client's
/// receive loop skips the frame.
///
/// # Examples
///
/// ```rust
/// use arp_sdk::shared::codec::{parse_frame, Frame};
///
/// let frame = parse_frame(r#"{"jsonrpc":"2.0","id":1,"method":"arp.listTools","params":{}}"#)?;
/// assert!(matches!(frame, Frame::Request(_)));
///
/// let frame = parse_frame(r#"{"jsonrpc":"2.0","method":"arp.emergencyStop","params":{"reason":"test"}}"#)?;
/// assert!(matches!(frame, Frame::Notification(_)));
/// # Ok::<(), arp_sdk::Error>(())
/// ```
pub fn parse_frame(text: &str) -> Result<Frame> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| TransportError::InvalidMessage(format!("Invalid JSON: {e}")))?;

    if value.get("method").is_some() {
        if value.get("id").is_some() {
            let request: JSONRPCRequest = serde_json::from_value(value)
                .map_err(|e| TransportError::InvalidMessage(format!("Invalid request: {e}")))?;
            Ok(Frame::Request(request))
        } else {
            let notification: JSONRPCNotification = serde_json::from_value(value).map_err(|e| {
                TransportError::InvalidMessage(format!("Invalid notification: {e}"))
            })?;
            Ok(Frame::Notification(notification))
        }
    } else if value.get("result").is_some() || value.get("error").is_some() {
        let response: JSONRPCResponse = serde_json::from_value(value)
            .map_err(|e| TransportError::InvalidMessage(format!("Invalid response: {e}")))?;
        Ok(Frame::Response(response))
    } else {
        Err(TransportError::InvalidMessage("Unknown message type".to_string()).into())
    }
}

/// Encode any frame struct to its wire text.
pub fn encode_frame<T: Serialize>(frame: &T) -> Result<String> {
    serde_json::to_string(frame)
        .map_err(|e| TransportError::InvalidMessage(format!("Failed to serialize frame: {e}")).into())
}

/// The response a server sends when it cannot parse an inbound frame.
///
/// The frame could not be correlated, so the id is fixed at `0`.
pub fn parse_error_response() -> JSONRPCResponse {
    JSONRPCResponse::failure(0i64, JSONRPCError::new(ErrorCode::PARSE_ERROR, "Parse error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_request() {
        let frame =
            parse_frame(r#"{"jsonrpc":"2.0","id":3,"method":"arp.callTool","params":{"name":"go_home"}}"#)
                .unwrap();
        match frame {
            Frame::Request(req) => {
                assert_eq!(req.id, RequestId::Number(3));
                assert_eq!(req.method, "arp.callTool");
            },
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn classifies_notification() {
        let frame = parse_frame(
            r#"{"jsonrpc":"2.0","method":"arp.emergencyStop","params":{"reason":"human too close"}}"#,
        )
        .unwrap();
        assert!(matches!(frame, Frame::Notification(_)));
    }

    #[test]
    fn classifies_response() {
        let frame = parse_frame(r#"{"jsonrpc":"2.0","id":1,"result":{"status":"ok"}}"#).unwrap();
        match frame {
            Frame::Response(resp) => assert!(resp.result().is_some()),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_frame("{not json").is_err());
    }

    #[test]
    fn rejects_shapeless_object() {
        assert!(parse_frame(r#"{"jsonrpc":"2.0","id":1}"#).is_err());
    }

    #[test]
    fn parse_error_response_has_fixed_id() {
        let resp = parse_error_response();
        assert_eq!(resp.id, RequestId::Number(0));
        assert_eq!(resp.error().map(|e| e.code), Some(-32700));
    }

    #[test]
    fn encode_decode_roundtrip() {
        let note = JSONRPCNotification::new("arp.toolProgress", serde_json::json!({"callId": "c1"}));
        let text = encode_frame(&note).unwrap();
        let frame = parse_frame(&text).unwrap();
        assert_eq!(frame, Frame::Notification(note));
    }
}
