//! ARP server: registries, session lifecycle, and request dispatch.
//!
//! A [`Server`] represents one robot. It owns the tool, context-source,
//! and constraint registries, the active-call table, the subscription
//! engine, and the set of connected peers. Requests are dispatched by
//! method name behind the initialization gate; `arp.emergencyStop` arrives
//! as a notification and trips the sticky stop latch.
//!
//! # Examples
//!
//! ```rust,no_run
//! use arp_sdk::server::Server;
//! use arp_sdk::types::{PhysicalTool, SafetyLevel, SafetyMetadata};
//! use serde_json::json;
//!
//! # async fn example() -> arp_sdk::Result<()> {
//! let server = Server::builder()
//!     .name("sim-robot-arm")
//!     .version("0.1.0")
//!     .robot_model("Simulated 6-DOF Arm")
//!     .robot_type("manipulator")
//!     .tool(
//!         PhysicalTool::new("go_home", "Return the arm to its home position")
//!             .with_safety(SafetyMetadata::new(SafetyLevel::Normal)),
//!         |_args, _extra| async move { Ok(json!({"position": [0.0, 0.0, 0.5]})) },
//!     )
//!     .build();
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod constraints;
pub mod invocation;
pub mod registry;
pub mod subscriptions;
pub mod ws_server;

pub use invocation::{ActiveCalls, NotificationSender, RequestHandlerExtra};
pub use registry::{ContextEntry, ContextProvider, Registries, ToolEntry, ToolHandler};
pub use subscriptions::SubscriptionManager;
pub use ws_server::PeerSet;

use crate::error::{Error, ErrorCode, Result};
use crate::shared::codec::encode_frame;
use crate::types::{
    methods, CallToolParams, CallToolResult, CancelToolParams, CancelToolResult, Capabilities,
    ClientInfo, ContextSource, EmergencyStopParams, GetConstraintParams, InitializeParams,
    InitializeResult, JSONRPCError, JSONRPCNotification, JSONRPCResponse, ListConstraintsResult,
    ListContextResult, ListToolsResult, PhysicalTool, RequestId, SafetyConstraint, ServerInfo,
    SetWorkspaceParams, SetWorkspaceResult, ShutdownResult, SubscribeContextParams,
    SubscribeContextResult, ToolProgressParams, ToolState, UnsubscribeContextParams,
    UnsubscribeContextResult,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const KNOWN_METHODS: &[&str] = &[
    methods::INITIALIZE,
    methods::SHUTDOWN,
    methods::LIST_TOOLS,
    methods::CALL_TOOL,
    methods::CANCEL_TOOL,
    methods::LIST_CONTEXT,
    methods::SUBSCRIBE_CONTEXT,
    methods::UNSUBSCRIBE_CONTEXT,
    methods::LIST_CONSTRAINTS,
    methods::GET_CONSTRAINT,
    methods::SET_WORKSPACE,
];

/// Per-session state.
///
/// Held at server scope: one operator session per robot, shared by every
/// connected peer. The emergency-stop latch is sticky and cleared only by
/// teardown.
#[derive(Debug, Default)]
struct SessionState {
    initialized: AtomicBool,
    emergency_stopped: AtomicBool,
    client: parking_lot::RwLock<Option<(ClientInfo, Capabilities, String)>>,
    workspace: parking_lot::RwLock<Option<SetWorkspaceParams>>,
}

struct ListenerTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// An ARP server fronting one robot.
pub struct Server {
    info: ServerInfo,
    capabilities: Capabilities,
    host: String,
    port: u16,
    registries: Registries,
    calls: ActiveCalls,
    subscriptions: SubscriptionManager,
    peers: Arc<PeerSet>,
    notifier: NotificationSender,
    session: SessionState,
    listener: Mutex<Option<ListenerTask>>,
}

impl Server {
    /// Start building a server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The server's implementation info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// The server's advertised capabilities.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Whether the session handshake has completed.
    pub fn is_initialized(&self) -> bool {
        self.session.initialized.load(Ordering::Acquire)
    }

    /// Whether the sticky emergency-stop latch is set.
    pub fn is_emergency_stopped(&self) -> bool {
        self.session.emergency_stopped.load(Ordering::Acquire)
    }

    pub(crate) fn peers(&self) -> &PeerSet {
        &self.peers
    }

    /// Register a tool after construction.
    pub fn add_tool(&self, descriptor: PhysicalTool, handler: impl ToolHandler + 'static) {
        self.registries.insert_tool(descriptor, Arc::new(handler));
    }

    /// Register a context source after construction.
    pub fn add_context_source(
        &self,
        descriptor: ContextSource,
        provider: impl ContextProvider + 'static,
    ) {
        self.registries.insert_source(descriptor, Arc::new(provider));
    }

    /// Register a safety constraint after construction.
    pub fn add_constraint(&self, constraint: SafetyConstraint) {
        self.registries.insert_constraint(constraint);
    }

    /// Emit an `arp.toolProgress` notification to all connected peers.
    ///
    /// Public so embedding code can report progress for a call it is
    /// driving outside a handler; handlers themselves use
    /// [`RequestHandlerExtra::send_progress`].
    pub fn send_progress(&self, call_id: &str, progress: f64, message: impl Into<String>) {
        let params = ToolProgressParams {
            call_id: call_id.to_string(),
            progress: Some(progress),
            message: message.into(),
            state: ToolState::Running,
        };
        if let Ok(value) = serde_json::to_value(&params) {
            (self.notifier)(JSONRPCNotification::new(methods::TOOL_PROGRESS, value));
        }
    }

    // --- Lifecycle ---

    /// Bind and serve until the task is cancelled. Never returns under
    /// normal operation.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(crate::error::TransportError::from)?;
        let addr = listener
            .local_addr()
            .map_err(crate::error::TransportError::from)?;
        tracing::info!(%addr, server = %self.info.name, "ARP server listening");
        ws_server::serve(self.clone(), listener, CancellationToken::new()).await;
        Ok(())
    }

    /// Bind and serve in a background task; returns the bound address.
    ///
    /// Intended for embedding and tests (bind port 0 for an ephemeral
    /// port). Pair with [`Server::stop`].
    pub async fn start(self: Arc<Self>) -> Result<SocketAddr> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(crate::error::TransportError::from)?;
        let addr = listener
            .local_addr()
            .map_err(crate::error::TransportError::from)?;
        let token = CancellationToken::new();
        let handle = tokio::spawn(ws_server::serve(self.clone(), listener, token.clone()));
        *self.listener.lock().await = Some(ListenerTask { token, handle });
        tracing::info!(%addr, server = %self.info.name, "ARP server listening");
        Ok(addr)
    }

    /// Stop serving: cancel every subscription task and the accept loop.
    pub async fn stop(&self) {
        self.subscriptions.shutdown().await;
        if let Some(task) = self.listener.lock().await.take() {
            task.token.cancel();
            task.handle.abort();
        }
        tracing::info!(server = %self.info.name, "ARP server stopped");
    }

    // --- Dispatch ---

    /// Handle one request frame and produce its response.
    pub async fn handle_request(&self, id: RequestId, method: &str, params: Value) -> JSONRPCResponse {
        tracing::debug!(%id, method, "request");
        match self.dispatch(method, params).await {
            Ok(result) => JSONRPCResponse::success(id, result),
            Err(err) => JSONRPCResponse::failure(id, error_object(err)),
        }
    }

    /// Handle one notification frame.
    pub async fn handle_notification(&self, notification: JSONRPCNotification) {
        if notification.method == methods::EMERGENCY_STOP {
            let reason = serde_json::from_value::<EmergencyStopParams>(notification.params)
                .map_or_else(|_| "Unknown".to_string(), |p| p.reason);
            self.trigger_emergency_stop(&reason).await;
        } else {
            tracing::debug!(method = %notification.method, "ignoring notification");
        }
    }

    async fn trigger_emergency_stop(&self, reason: &str) {
        tracing::warn!(reason, "EMERGENCY STOP");
        self.session
            .emergency_stopped
            .store(true, Ordering::Release);
        let interrupted = self.calls.cancel_running().await;
        if !interrupted.is_empty() {
            tracing::warn!(tools = ?interrupted, "running calls cancelled by emergency stop");
        }
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value> {
        if !KNOWN_METHODS.contains(&method) {
            return Err(Error::method_not_found(method));
        }
        if method != methods::INITIALIZE && !self.is_initialized() {
            return Err(Error::protocol(ErrorCode::NOT_INITIALIZED, "Not initialized"));
        }

        match method {
            methods::INITIALIZE => to_result(self.handle_initialize(parse_params(params)?)),
            methods::SHUTDOWN => to_result(self.handle_shutdown().await),
            methods::LIST_TOOLS => to_result(ListToolsResult {
                tools: self.registries.list_tools(),
            }),
            methods::CALL_TOOL => to_result(self.handle_call_tool(parse_params(params)?).await?),
            methods::CANCEL_TOOL => {
                to_result(self.handle_cancel_tool(parse_params(params)?).await)
            },
            methods::LIST_CONTEXT => to_result(ListContextResult {
                sources: self.registries.list_sources(),
            }),
            methods::SUBSCRIBE_CONTEXT => {
                to_result(self.handle_subscribe_context(parse_params(params)?).await?)
            },
            methods::UNSUBSCRIBE_CONTEXT => {
                to_result(self.handle_unsubscribe_context(parse_params(params)?).await)
            },
            methods::LIST_CONSTRAINTS => to_result(ListConstraintsResult {
                constraints: self.registries.list_constraints(),
            }),
            methods::GET_CONSTRAINT => to_result(self.handle_get_constraint(&parse_params(params)?)?),
            methods::SET_WORKSPACE => to_result(self.handle_set_workspace(parse_params(params)?)),
            _ => unreachable!("method membership checked above"),
        }
    }

    // --- Method implementations ---

    fn handle_initialize(&self, params: InitializeParams) -> InitializeResult {
        *self.session.client.write() = Some((
            params.client_info,
            params.capabilities,
            params.protocol_version,
        ));
        self.session.initialized.store(true, Ordering::Release);
        InitializeResult {
            protocol_version: crate::PROTOCOL_VERSION.to_string(),
            server_info: self.info.clone(),
            capabilities: self.capabilities,
        }
    }

    async fn handle_shutdown(&self) -> ShutdownResult {
        self.subscriptions.shutdown().await;
        self.session.initialized.store(false, Ordering::Release);
        ShutdownResult {
            status: "ok".to_string(),
        }
    }

    async fn handle_call_tool(&self, params: CallToolParams) -> Result<CallToolResult> {
        if self.is_emergency_stopped() {
            return Err(Error::protocol(
                ErrorCode::EMERGENCY_STOPPED,
                "Emergency stop active",
            ));
        }

        let entry = self.registries.tool(&params.name).ok_or_else(|| {
            Error::protocol(
                ErrorCode::TOOL_NOT_FOUND,
                format!("Tool not found: {}", params.name),
            )
        })?;

        if let Some(call_id) = &params.call_id {
            if self.calls.is_running(call_id).await {
                return Err(Error::protocol(
                    ErrorCode::TOOL_BUSY,
                    format!("Tool call {call_id} already running"),
                ));
            }
        }
        let call_id = params
            .call_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let constraints = self.registries.list_constraints();
        if let Some(violation) = constraints::evaluate(&params.name, &params.arguments, &constraints)
        {
            return Err(Error::protocol_with_data(
                ErrorCode::SAFETY_VIOLATION,
                format!("Safety violation: {violation}"),
                serde_json::json!({"constraint": violation}),
            ));
        }

        if entry.descriptor.safety.requires_confirmation {
            return Err(Error::protocol_with_data(
                ErrorCode::SAFETY_VIOLATION,
                format!("Tool '{}' requires human confirmation", params.name),
                serde_json::json!({"requiresConfirmation": true}),
            ));
        }

        let (token, started) = self.calls.admit(&call_id, &params.name).await;
        let extra = RequestHandlerExtra::new(call_id.clone(), token, self.notifier.clone());
        extra.send_progress(0.0, "Starting execution");

        let handler_result = entry
            .handler
            .handle(Value::Object(params.arguments), extra)
            .await;
        let duration = started.elapsed().as_secs_f64();

        let (outcome, result, error) = match handler_result {
            Ok(value) => (ToolState::Completed, Some(value), None),
            Err(err) => (ToolState::Failed, None, Some(err.to_string())),
        };
        // A cancel or emergency stop that landed mid-handler wins.
        let terminal = self.calls.finish(&call_id, outcome).await;
        if terminal != outcome {
            tracing::debug!(%call_id, state = %terminal, "call finished in non-handler state");
        }

        Ok(CallToolResult {
            call_id,
            state: terminal,
            result: if terminal == ToolState::Completed {
                result
            } else {
                None
            },
            error: if terminal == ToolState::Failed {
                error
            } else {
                None
            },
            duration: Some(duration),
        })
    }

    async fn handle_cancel_tool(&self, params: CancelToolParams) -> CancelToolResult {
        let state = if self.calls.cancel(&params.call_id).await {
            "cancelled"
        } else {
            "not_found"
        };
        CancelToolResult {
            call_id: params.call_id,
            state: state.to_string(),
        }
    }

    async fn handle_subscribe_context(
        &self,
        params: SubscribeContextParams,
    ) -> Result<SubscribeContextResult> {
        let entry = self.registries.source(&params.name).ok_or_else(|| {
            Error::protocol(
                ErrorCode::CONTEXT_NOT_FOUND,
                format!("Context source not found: {}", params.name),
            )
        })?;
        self.subscriptions
            .subscribe(&entry.descriptor, entry.provider, params.max_rate)
            .await;
        Ok(SubscribeContextResult {
            subscribed: params.name,
        })
    }

    async fn handle_unsubscribe_context(
        &self,
        params: UnsubscribeContextParams,
    ) -> UnsubscribeContextResult {
        self.subscriptions.unsubscribe(&params.name).await;
        UnsubscribeContextResult {
            unsubscribed: params.name,
        }
    }

    fn handle_get_constraint(&self, params: &GetConstraintParams) -> Result<SafetyConstraint> {
        self.registries.constraint(&params.name).ok_or_else(|| {
            Error::protocol(
                ErrorCode::SAFETY_VIOLATION,
                format!("Constraint not found: {}", params.name),
            )
        })
    }

    fn handle_set_workspace(&self, params: SetWorkspaceParams) -> SetWorkspaceResult {
        let name = params.name.clone();
        *self.session.workspace.write() = Some(params);
        SetWorkspaceResult {
            status: "ok".to_string(),
            workspace: name,
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("info", &self.info)
            .field("initialized", &self.is_initialized())
            .field("emergency_stopped", &self.is_emergency_stopped())
            .field("peers", &self.peers.len())
            .finish_non_exhaustive()
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|e| Error::protocol(ErrorCode::INVALID_PARAMS, format!("Invalid params: {e}")))
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(Error::from)
}

fn error_object(err: Error) -> JSONRPCError {
    match err {
        Error::Protocol { code, message, data } => JSONRPCError {
            code: code.as_i32(),
            message,
            data,
        },
        other => JSONRPCError::new(ErrorCode::INTERNAL_ERROR, other.to_string()),
    }
}

/// Builder for [`Server`].
///
/// Name and version default to `"arp-server"` / `"0.1.0"`; the bind
/// address defaults to `0.0.0.0:8765`.
pub struct ServerBuilder {
    name: String,
    version: String,
    robot_model: Option<String>,
    robot_type: Option<String>,
    host: String,
    port: u16,
    tools: Vec<(PhysicalTool, Arc<dyn ToolHandler>)>,
    sources: Vec<(ContextSource, Arc<dyn ContextProvider>)>,
    constraints: Vec<SafetyConstraint>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self {
            name: "arp-server".to_string(),
            version: "0.1.0".to_string(),
            robot_model: None,
            robot_type: None,
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            tools: Vec::new(),
            sources: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Set the server name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the server version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the robot model string.
    #[must_use]
    pub fn robot_model(mut self, model: impl Into<String>) -> Self {
        self.robot_model = Some(model.into());
        self
    }

    /// Set the robot type string.
    #[must_use]
    pub fn robot_type(mut self, robot_type: impl Into<String>) -> Self {
        self.robot_type = Some(robot_type.into());
        self
    }

    /// Set the bind host and port.
    #[must_use]
    pub fn bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Register a physical tool.
    #[must_use]
    pub fn tool(mut self, descriptor: PhysicalTool, handler: impl ToolHandler + 'static) -> Self {
        self.tools.push((descriptor, Arc::new(handler)));
        self
    }

    /// Register a context source.
    #[must_use]
    pub fn context_source(
        mut self,
        descriptor: ContextSource,
        provider: impl ContextProvider + 'static,
    ) -> Self {
        self.sources.push((descriptor, Arc::new(provider)));
        self
    }

    /// Register a safety constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: SafetyConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Build the server.
    pub fn build(self) -> Arc<Server> {
        let peers = Arc::new(PeerSet::new());
        let notifier: NotificationSender = {
            let peers = peers.clone();
            Arc::new(move |notification| {
                if let Ok(text) = encode_frame(&notification) {
                    peers.broadcast(&text);
                }
            })
        };

        let registries = Registries::new();
        for (descriptor, handler) in self.tools {
            registries.insert_tool(descriptor, handler);
        }
        for (descriptor, provider) in self.sources {
            registries.insert_source(descriptor, provider);
        }
        for constraint in self.constraints {
            registries.insert_constraint(constraint);
        }

        Arc::new(Server {
            info: ServerInfo {
                name: self.name,
                version: self.version,
                robot_model: self.robot_model,
                robot_type: self.robot_type,
            },
            capabilities: Capabilities::default(),
            host: self.host,
            port: self.port,
            registries,
            calls: ActiveCalls::new(),
            subscriptions: SubscriptionManager::new(notifier.clone()),
            peers,
            notifier,
            session: SessionState::default(),
            listener: Mutex::new(None),
        })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("tools", &self.tools.len())
            .field("sources", &self.sources.len())
            .field("constraints", &self.constraints.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_server() -> Arc<Server> {
        Server::builder()
            .name("test-robot")
            .version("0.1.0")
            .robot_model("Test Arm")
            .tool(
                PhysicalTool::new("go_home", "Return to home"),
                |_args: Value, _extra: RequestHandlerExtra| async move {
                    Ok(json!({"position": [0.0, 0.0, 0.5]}))
                },
            )
            .build()
    }

    async fn initialize(server: &Arc<Server>) {
        let params = json!({
            "protocolVersion": "0.1.0",
            "clientInfo": {"name": "test-client", "version": "0.1.0"},
            "capabilities": {}
        });
        let response = server
            .handle_request(RequestId::from(1i64), methods::INITIALIZE, params)
            .await;
        assert!(response.result().is_some());
    }

    #[tokio::test]
    async fn uninitialized_requests_are_rejected() {
        let server = test_server();
        let response = server
            .handle_request(RequestId::from(1i64), methods::LIST_TOOLS, json!({}))
            .await;
        assert_eq!(response.error().map(|e| e.code), Some(-40009));
    }

    #[tokio::test]
    async fn unknown_method_wins_over_init_gate() {
        let server = test_server();
        let response = server
            .handle_request(RequestId::from(1i64), "arp.teleport", json!({}))
            .await;
        assert_eq!(response.error().map(|e| e.code), Some(-32601));
    }

    #[tokio::test]
    async fn initialize_is_idempotent_in_effect() {
        let server = test_server();
        initialize(&server).await;
        assert!(server.is_initialized());

        let params = json!({
            "protocolVersion": "0.1.0",
            "clientInfo": {"name": "test-client", "version": "0.1.0"}
        });
        let second = server
            .handle_request(RequestId::from(2i64), methods::INITIALIZE, params)
            .await;
        let result = second.result().unwrap();
        assert_eq!(result["serverInfo"]["name"], json!("test-robot"));
        assert_eq!(result["serverInfo"]["robotModel"], json!("Test Arm"));
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn shutdown_clears_initialized() {
        let server = test_server();
        initialize(&server).await;
        let response = server
            .handle_request(RequestId::from(2i64), methods::SHUTDOWN, json!({}))
            .await;
        assert_eq!(response.result().unwrap()["status"], json!("ok"));
        assert!(!server.is_initialized());
    }

    #[tokio::test]
    async fn happy_call_reports_completed_with_duration() {
        let server = test_server();
        initialize(&server).await;
        let response = server
            .handle_request(
                RequestId::from(2i64),
                methods::CALL_TOOL,
                json!({"name": "go_home"}),
            )
            .await;
        let result = response.result().unwrap();
        assert_eq!(result["state"], json!("completed"));
        assert_eq!(result["result"]["position"], json!([0.0, 0.0, 0.5]));
        assert!(result["duration"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn set_workspace_is_recorded() {
        let server = test_server();
        initialize(&server).await;
        let response = server
            .handle_request(
                RequestId::from(2i64),
                methods::SET_WORKSPACE,
                json!({
                    "name": "bench",
                    "bounds": {"min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 1.0]},
                    "objects": [{"name": "vise"}]
                }),
            )
            .await;
        let result = response.result().unwrap();
        assert_eq!(result["status"], json!("ok"));
        assert_eq!(result["workspace"], json!("bench"));
        assert_eq!(
            server.session.workspace.read().as_ref().map(|w| w.objects.len()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn invalid_params_are_rejected() {
        let server = test_server();
        initialize(&server).await;
        let response = server
            .handle_request(RequestId::from(2i64), methods::CALL_TOOL, json!({"no_name": 1}))
            .await;
        assert_eq!(response.error().map(|e| e.code), Some(-32602));
    }
}
