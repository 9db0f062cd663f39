//! Client-side request/response correlation.
//!
//! The client allocates monotonically increasing integer ids and parks a
//! completion slot per outstanding request; the single receive task resolves
//! slots as matching responses arrive. When the transport closes, every
//! outstanding slot fails deterministically with a connection-closed error.

use crate::error::{Result, TransportError};
use crate::types::{JSONRPCResponse, RequestId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{oneshot, Mutex};

/// Pending requests awaiting responses, keyed by the outgoing numeric id.
#[derive(Debug)]
pub struct PendingRequests {
    next_id: AtomicI64,
    slots: Mutex<HashMap<i64, oneshot::Sender<JSONRPCResponse>>>,
}

impl PendingRequests {
    /// Create an empty correlation table. Ids start at 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate the next request id.
    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a completion slot for an outgoing request.
    pub async fn register(&self, id: i64) -> oneshot::Receiver<JSONRPCResponse> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().await.insert(id, tx);
        rx
    }

    /// Resolve the slot matching a received response.
    ///
    /// Returns `false` when no slot matches (an unsolicited or string-id
    /// response), in which case the frame is dropped by the caller.
    pub async fn complete(&self, response: JSONRPCResponse) -> bool {
        let RequestId::Number(id) = response.id else {
            return false;
        };
        let slot = self.slots.lock().await.remove(&id);
        match slot {
            // A dropped receiver just means the caller gave up waiting.
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Drop a slot without resolving it.
    pub async fn forget(&self, id: i64) {
        self.slots.lock().await.remove(&id);
    }

    /// Fail every outstanding request with a connection-closed error.
    ///
    /// Dropping the senders wakes each waiter, which maps the closed
    /// channel to [`TransportError::ConnectionClosed`].
    pub async fn fail_all(&self) {
        self.slots.lock().await.clear();
    }

    /// Await a previously registered slot.
    pub async fn wait(rx: oneshot::Receiver<JSONRPCResponse>) -> Result<JSONRPCResponse> {
        rx.await.map_err(|_| TransportError::ConnectionClosed.into())
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let pending = PendingRequests::new();
        let a = pending.next_id();
        let b = pending.next_id();
        assert!(b > a);
    }

    #[tokio::test]
    async fn register_and_complete() {
        let pending = PendingRequests::new();
        let id = pending.next_id();
        let rx = pending.register(id).await;

        let response = JSONRPCResponse::success(id, serde_json::json!({"status": "ok"}));
        assert!(pending.complete(response.clone()).await);

        let received = PendingRequests::wait(rx).await.unwrap();
        assert_eq!(received, response);
    }

    #[tokio::test]
    async fn unsolicited_response_is_dropped() {
        let pending = PendingRequests::new();
        let response = JSONRPCResponse::success(99i64, serde_json::json!(null));
        assert!(!pending.complete(response).await);

        let string_id = JSONRPCResponse::success("abc", serde_json::json!(null));
        assert!(!pending.complete(string_id).await);
    }

    #[tokio::test]
    async fn fail_all_wakes_waiters_with_connection_closed() {
        let pending = PendingRequests::new();
        let id = pending.next_id();
        let rx = pending.register(id).await;

        pending.fail_all().await;

        let err = PendingRequests::wait(rx).await.unwrap_err();
        assert!(err.to_string().contains("connection closed"));
    }
}
