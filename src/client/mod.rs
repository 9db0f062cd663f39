//! ARP client: connect to a robot server and drive it.
//!
//! The client owns a single WebSocket connection, a monotonically
//! increasing request id, a pending-request map, and one background
//! receive task that correlates responses and dispatches unsolicited
//! notifications to registered callbacks (progress by call id, context
//! updates by source name).
//!
//! # Examples
//!
//! ```rust,no_run
//! use arp_sdk::client::Client;
//! use serde_json::json;
//!
//! # async fn example() -> arp_sdk::Result<()> {
//! let client = Client::connect("ws://localhost:8765").await?;
//! client.initialize().await?;
//!
//! let tools = client.list_tools().await?;
//! println!("robot offers {} tools", tools.len());
//!
//! let result = client
//!     .call_tool("move_to", json!({"target": [1.0, 0.5, 0.0]}))
//!     .await?;
//! println!("state: {}", result.state);
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, ErrorCode, Result};
use crate::shared::codec::{encode_frame, parse_frame, Frame};
use crate::shared::protocol::PendingRequests;
use crate::shared::ws::{self, WsReceiver, WsSender};
use crate::types::{
    methods, BoundingBox, CallToolResult, CancelToolResult, Capabilities, ClientInfo,
    ContextSource, ContextUpdateParams, GetConstraintParams, InitializeResult, JSONRPCNotification,
    JSONRPCRequest, JSONRPCResponse, ListConstraintsResult, ListContextResult, ListToolsResult,
    PhysicalTool, SafetyConstraint, SetWorkspaceResult, SubscribeContextParams,
    ToolProgressParams, ToolState, UnsubscribeContextResult, WorkspaceObject,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Callback invoked for `arp.toolProgress` notifications of one call.
pub type ProgressCallback = Arc<dyn Fn(ToolProgressParams) + Send + Sync>;

/// Callback invoked for `arp.contextUpdate` notifications of one source.
pub type ContextCallback = Arc<dyn Fn(ContextUpdateParams) + Send + Sync>;

type CallbackMap<T> = Arc<parking_lot::RwLock<HashMap<String, T>>>;

/// A connected ARP client.
pub struct Client {
    client_info: ClientInfo,
    sender: Arc<Mutex<WsSender>>,
    pending: Arc<PendingRequests>,
    progress_callbacks: CallbackMap<ProgressCallback>,
    context_callbacks: CallbackMap<ContextCallback>,
    receive_task: JoinHandle<()>,
    initialized: AtomicBool,
    server_info: parking_lot::RwLock<Option<crate::types::ServerInfo>>,
    server_capabilities: parking_lot::RwLock<Option<Capabilities>>,
}

impl Client {
    /// Connect to `ws://host:port` with default client info.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_as(url, "arp-client", "0.1.0").await
    }

    /// Connect with explicit client name and version.
    pub async fn connect_as(url: &str, name: &str, version: &str) -> Result<Self> {
        let (sender, receiver) = ws::connect(url).await?;
        let pending = Arc::new(PendingRequests::new());
        let progress_callbacks: CallbackMap<ProgressCallback> =
            Arc::new(parking_lot::RwLock::new(HashMap::new()));
        let context_callbacks: CallbackMap<ContextCallback> =
            Arc::new(parking_lot::RwLock::new(HashMap::new()));

        let receive_task = tokio::spawn(receive_loop(
            receiver,
            pending.clone(),
            progress_callbacks.clone(),
            context_callbacks.clone(),
        ));

        Ok(Self {
            client_info: ClientInfo {
                name: name.to_string(),
                version: version.to_string(),
            },
            sender: Arc::new(Mutex::new(sender)),
            pending,
            progress_callbacks,
            context_callbacks,
            receive_task,
            initialized: AtomicBool::new(false),
            server_info: parking_lot::RwLock::new(None),
            server_capabilities: parking_lot::RwLock::new(None),
        })
    }

    /// Info the server reported at initialize time.
    pub fn server_info(&self) -> Option<crate::types::ServerInfo> {
        self.server_info.read().clone()
    }

    /// Capabilities the server reported at initialize time.
    pub fn server_capabilities(&self) -> Option<Capabilities> {
        *self.server_capabilities.read()
    }

    // --- Connection lifecycle ---

    /// Perform the `arp.initialize` handshake.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let params = serde_json::json!({
            "protocolVersion": crate::PROTOCOL_VERSION,
            "clientInfo": self.client_info,
            "capabilities": {"planning": true, "confirmation": true},
        });
        let result = self.request(methods::INITIALIZE, params).await?;
        let init: InitializeResult = serde_json::from_value(result)?;
        *self.server_info.write() = Some(init.server_info.clone());
        *self.server_capabilities.write() = Some(init.capabilities);
        self.initialized.store(true, Ordering::Release);
        Ok(init)
    }

    /// Disconnect, sending a best-effort `arp.shutdown` first when the
    /// session is initialized. All pending requests fail.
    pub async fn disconnect(self) {
        if self.initialized.load(Ordering::Acquire) {
            let _ = self.request(methods::SHUTDOWN, serde_json::json!({})).await;
        }
        self.receive_task.abort();
        let _ = self.sender.lock().await.close().await;
        self.pending.fail_all().await;
    }

    // --- Tools ---

    /// List the server's physical tools.
    pub async fn list_tools(&self) -> Result<Vec<PhysicalTool>> {
        self.ensure_initialized()?;
        let result = self.request(methods::LIST_TOOLS, serde_json::json!({})).await?;
        let listed: ListToolsResult = serde_json::from_value(result)?;
        Ok(listed.tools)
    }

    /// Invoke a tool with a JSON object of arguments.
    ///
    /// A protocol-level rejection (safety violation, unknown tool, ...) is
    /// folded into a `failed` [`CallToolResult`] carrying the error
    /// message, so a planner reads one uniform outcome type.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        self.call_tool_inner(name, arguments, None).await
    }

    /// Invoke a tool and observe its `arp.toolProgress` notifications.
    pub async fn call_tool_with_progress(
        &self,
        name: &str,
        arguments: Value,
        on_progress: impl Fn(ToolProgressParams) + Send + Sync + 'static,
    ) -> Result<CallToolResult> {
        self.call_tool_inner(name, arguments, Some(Arc::new(on_progress)))
            .await
    }

    async fn call_tool_inner(
        &self,
        name: &str,
        arguments: Value,
        on_progress: Option<ProgressCallback>,
    ) -> Result<CallToolResult> {
        self.ensure_initialized()?;
        let call_id = uuid::Uuid::new_v4().to_string();
        if let Some(callback) = on_progress {
            self.progress_callbacks
                .write()
                .insert(call_id.clone(), callback);
        }

        let arguments = arguments.as_object().cloned().unwrap_or_default();
        let params = serde_json::json!({
            "name": name,
            "callId": call_id,
            "arguments": arguments,
        });
        let outcome = self.request(methods::CALL_TOOL, params).await;
        self.progress_callbacks.write().remove(&call_id);

        match outcome {
            Ok(result) => Ok(serde_json::from_value(result)?),
            // The robot refused; report it as a failed call outcome.
            Err(Error::Protocol { message, .. }) => Ok(CallToolResult {
                call_id,
                state: ToolState::Failed,
                result: None,
                error: Some(message),
                duration: None,
            }),
            Err(other) => Err(other),
        }
    }

    /// Request cooperative cancellation of a live call.
    pub async fn cancel_tool(&self, call_id: &str) -> Result<CancelToolResult> {
        self.ensure_initialized()?;
        let params = serde_json::json!({"callId": call_id});
        let result = self.request(methods::CANCEL_TOOL, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    // --- Context ---

    /// List the server's context sources.
    pub async fn list_context(&self) -> Result<Vec<ContextSource>> {
        self.ensure_initialized()?;
        let result = self.request(methods::LIST_CONTEXT, serde_json::json!({})).await?;
        let listed: ListContextResult = serde_json::from_value(result)?;
        Ok(listed.sources)
    }

    /// Subscribe to a context stream, optionally capping the rate in Hz.
    pub async fn subscribe_context(
        &self,
        name: &str,
        max_rate: Option<f64>,
        callback: impl Fn(ContextUpdateParams) + Send + Sync + 'static,
    ) -> Result<()> {
        self.ensure_initialized()?;
        self.context_callbacks
            .write()
            .insert(name.to_string(), Arc::new(callback));

        let params = SubscribeContextParams {
            name: name.to_string(),
            max_rate,
        };
        let outcome = self
            .request(methods::SUBSCRIBE_CONTEXT, serde_json::to_value(params)?)
            .await;
        if let Err(err) = outcome {
            self.context_callbacks.write().remove(name);
            return Err(err);
        }
        Ok(())
    }

    /// Unsubscribe from a context stream.
    pub async fn unsubscribe_context(&self, name: &str) -> Result<UnsubscribeContextResult> {
        self.ensure_initialized()?;
        self.context_callbacks.write().remove(name);
        let params = serde_json::json!({"name": name});
        let result = self.request(methods::UNSUBSCRIBE_CONTEXT, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    // --- Constraints and workspace ---

    /// List the server's safety constraints.
    pub async fn list_constraints(&self) -> Result<Vec<SafetyConstraint>> {
        self.ensure_initialized()?;
        let result = self
            .request(methods::LIST_CONSTRAINTS, serde_json::json!({}))
            .await?;
        let listed: ListConstraintsResult = serde_json::from_value(result)?;
        Ok(listed.constraints)
    }

    /// Fetch one constraint by name.
    pub async fn get_constraint(&self, name: &str) -> Result<SafetyConstraint> {
        self.ensure_initialized()?;
        let params = GetConstraintParams {
            name: name.to_string(),
        };
        let result = self
            .request(methods::GET_CONSTRAINT, serde_json::to_value(params)?)
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Declare the active workspace.
    pub async fn set_workspace(
        &self,
        name: &str,
        bounds: BoundingBox,
        objects: Vec<WorkspaceObject>,
    ) -> Result<SetWorkspaceResult> {
        self.ensure_initialized()?;
        let params = serde_json::json!({
            "name": name,
            "bounds": bounds,
            "objects": objects,
        });
        let result = self.request(methods::SET_WORKSPACE, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    // --- Emergency stop ---

    /// Trigger the server's emergency stop. Out of band: works whether or
    /// not the session is initialized, and expects no response.
    pub async fn emergency_stop(&self, reason: &str) -> Result<()> {
        self.send_notification(methods::EMERGENCY_STOP, serde_json::json!({"reason": reason}))
            .await
    }

    // --- Plumbing ---

    /// Send a request and await the matching response frame.
    pub async fn send_request(&self, method: &str, params: Value) -> Result<JSONRPCResponse> {
        let id = self.pending.next_id();
        let rx = self.pending.register(id).await;
        let frame = JSONRPCRequest::new(id, method, params);
        let text = encode_frame(&frame)?;

        if let Err(err) = self.sender.lock().await.send_text(text).await {
            self.pending.forget(id).await;
            return Err(err);
        }
        PendingRequests::wait(rx).await
    }

    /// Send a notification (no response expected).
    pub async fn send_notification(&self, method: &str, params: Value) -> Result<()> {
        let frame = JSONRPCNotification::new(method, params);
        let text = encode_frame(&frame)?;
        self.sender.lock().await.send_text(text).await
    }

    /// Send a request and unwrap the result, mapping a wire error object to
    /// [`Error::Protocol`].
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let response = self.send_request(method, params).await?;
        match response.payload {
            crate::types::ResponsePayload::Result { result } => Ok(result),
            crate::types::ResponsePayload::Error { error } => Err(Error::Protocol {
                code: ErrorCode(error.code),
                message: error.message,
                data: error.data,
            }),
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::protocol(
                ErrorCode::NOT_INITIALIZED,
                "Client not initialized. Call initialize() first.",
            ))
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_info", &self.client_info)
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

async fn receive_loop(
    mut receiver: WsReceiver,
    pending: Arc<PendingRequests>,
    progress_callbacks: CallbackMap<ProgressCallback>,
    context_callbacks: CallbackMap<ContextCallback>,
) {
    loop {
        match receiver.next_text().await {
            Some(Ok(text)) => match parse_frame(&text) {
                Ok(Frame::Response(response)) => {
                    if !pending.complete(response).await {
                        tracing::debug!("dropping uncorrelated response");
                    }
                },
                Ok(Frame::Notification(notification)) => {
                    dispatch_notification(notification, &progress_callbacks, &context_callbacks);
                },
                // Server-to-client requests are not part of the protocol.
                Ok(Frame::Request(_)) => {},
                // Malformed frames cannot be correlated; skip them.
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unparseable frame");
                },
            },
            Some(Err(err)) => {
                tracing::debug!(error = %err, "connection lost");
                pending.fail_all().await;
                return;
            },
            None => {
                tracing::debug!("connection closed");
                pending.fail_all().await;
                return;
            },
        }
    }
}

fn dispatch_notification(
    notification: JSONRPCNotification,
    progress_callbacks: &CallbackMap<ProgressCallback>,
    context_callbacks: &CallbackMap<ContextCallback>,
) {
    match notification.method.as_str() {
        methods::TOOL_PROGRESS => {
            if let Ok(params) = serde_json::from_value::<ToolProgressParams>(notification.params) {
                let callback = progress_callbacks.read().get(&params.call_id).cloned();
                if let Some(callback) = callback {
                    callback(params);
                }
            }
        },
        methods::CONTEXT_UPDATE => {
            if let Ok(params) = serde_json::from_value::<ContextUpdateParams>(notification.params) {
                let callback = context_callbacks.read().get(&params.name).cloned();
                if let Some(callback) = callback {
                    callback(params);
                }
            }
        },
        other => {
            tracing::debug!(method = other, "ignoring notification");
        },
    }
}
