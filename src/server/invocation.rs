//! Active-call tracking for the tool invocation pipeline.
//!
//! Each admitted call gets a transient record (tool name, state, admission
//! instant) and a cancellation token. Cancellation is cooperative: it flips
//! the record to `cancelled` and fires the token; a handler that wants to
//! stop early observes the token through its [`RequestHandlerExtra`].
//! A record never leaves a terminal state, so a call cancelled while its
//! handler runs stays `cancelled` even after the handler returns.

use crate::types::{methods, JSONRPCNotification, ToolProgressParams, ToolState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Callback used by the engines to broadcast a notification to all peers.
pub type NotificationSender = Arc<dyn Fn(JSONRPCNotification) + Send + Sync>;

/// Extra context passed to tool handlers.
///
/// Carries the call id, a cancellation token fired by `arp.cancelTool` and
/// by emergency stop, and a progress channel back to connected peers.
///
/// # Examples
///
/// ```rust,no_run
/// use arp_sdk::{RequestHandlerExtra, Result};
/// use serde_json::Value;
///
/// async fn slow_move(args: Value, extra: RequestHandlerExtra) -> Result<Value> {
///     for step in 0..10 {
///         if extra.is_cancelled() {
///             return Err(arp_sdk::Error::handler("motion aborted"));
///         }
///         extra.send_progress(f64::from(step) / 10.0, "moving");
///         tokio::time::sleep(std::time::Duration::from_millis(100)).await;
///     }
///     Ok(args)
/// }
/// ```
#[derive(Clone)]
pub struct RequestHandlerExtra {
    /// The admitted call id.
    pub call_id: String,
    /// Cancellation token for the call.
    pub cancellation_token: CancellationToken,
    notifier: NotificationSender,
}

impl RequestHandlerExtra {
    pub(crate) fn new(
        call_id: String,
        cancellation_token: CancellationToken,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            call_id,
            cancellation_token,
            notifier,
        }
    }

    /// Check whether the call has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Wait for cancellation.
    pub async fn cancelled(&self) {
        self.cancellation_token.cancelled().await;
    }

    /// Emit an `arp.toolProgress` notification for this call.
    ///
    /// `progress` is a fraction in `[0, 1]`.
    pub fn send_progress(&self, progress: f64, message: impl Into<String>) {
        let params = ToolProgressParams {
            call_id: self.call_id.clone(),
            progress: Some(progress),
            message: message.into(),
            state: ToolState::Running,
        };
        if let Ok(value) = serde_json::to_value(&params) {
            (self.notifier)(JSONRPCNotification::new(methods::TOOL_PROGRESS, value));
        }
    }
}

impl std::fmt::Debug for RequestHandlerExtra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandlerExtra")
            .field("call_id", &self.call_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// One live (or recently finished) invocation.
#[derive(Debug)]
struct CallRecord {
    tool: String,
    state: ToolState,
    started: Instant,
    token: CancellationToken,
}

/// The shared active-call table.
///
/// Records are created at admission and retained after their terminal
/// transition so `arp.cancelTool` can report on completed ids.
#[derive(Debug, Default)]
pub struct ActiveCalls {
    calls: RwLock<HashMap<String, CallRecord>>,
}

impl ActiveCalls {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the given call id currently maps to a running call.
    pub async fn is_running(&self, call_id: &str) -> bool {
        self.calls
            .read()
            .await
            .get(call_id)
            .is_some_and(|record| record.state == ToolState::Running)
    }

    /// Record a freshly admitted call as `running` and hand back its token
    /// and admission instant.
    pub async fn admit(&self, call_id: &str, tool: &str) -> (CancellationToken, Instant) {
        let token = CancellationToken::new();
        let started = Instant::now();
        self.calls.write().await.insert(
            call_id.to_string(),
            CallRecord {
                tool: tool.to_string(),
                state: ToolState::Running,
                started,
                token: token.clone(),
            },
        );
        (token, started)
    }

    /// Transition a call out of `running` after its handler returned.
    ///
    /// Returns the record's terminal state: `outcome` if the call was still
    /// running, or the state it already reached (e.g. `cancelled` while the
    /// handler was in flight).
    pub async fn finish(&self, call_id: &str, outcome: ToolState) -> ToolState {
        let mut calls = self.calls.write().await;
        match calls.get_mut(call_id) {
            Some(record) if record.state == ToolState::Running => {
                record.state = outcome;
                outcome
            },
            Some(record) => record.state,
            None => outcome,
        }
    }

    /// Mark a call `cancelled` and fire its token. Returns `false` for an
    /// unknown call id.
    pub async fn cancel(&self, call_id: &str) -> bool {
        let mut calls = self.calls.write().await;
        match calls.get_mut(call_id) {
            Some(record) => {
                record.state = ToolState::Cancelled;
                record.token.cancel();
                true
            },
            None => false,
        }
    }

    /// Emergency-stop sweep: cancel every running call. Returns the names
    /// of the tools that were interrupted.
    pub async fn cancel_running(&self) -> Vec<String> {
        let mut calls = self.calls.write().await;
        let mut interrupted = Vec::new();
        for record in calls.values_mut() {
            if record.state == ToolState::Running {
                record.state = ToolState::Cancelled;
                record.token.cancel();
                interrupted.push(record.tool.clone());
            }
        }
        interrupted
    }

    /// Current state of a call, if known.
    pub async fn state(&self, call_id: &str) -> Option<ToolState> {
        self.calls.read().await.get(call_id).map(|r| r.state)
    }

    /// Seconds elapsed since admission, if the call is known.
    pub async fn elapsed(&self, call_id: &str) -> Option<f64> {
        self.calls
            .read()
            .await
            .get(call_id)
            .map(|r| r.started.elapsed().as_secs_f64())
    }
}
