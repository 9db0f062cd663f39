//! Type definitions for the ARP protocol.

pub mod jsonrpc;
pub mod protocol;

pub use jsonrpc::{
    JSONRPCError, JSONRPCNotification, JSONRPCRequest, JSONRPCResponse, RequestId,
    ResponsePayload, JSONRPC_VERSION,
};
pub use protocol::{
    methods, ArgumentMap, BoundingBox, CallToolParams, CallToolResult, CancelToolParams,
    CancelToolResult, Capabilities, ClientInfo, Condition, ConstraintType, ContextDataType,
    ContextSource, ContextUpdateParams, Effect, EmergencyStopParams, GetConstraintParams,
    InitializeParams, InitializeResult, ListConstraintsResult, ListContextResult,
    ListToolsResult, PhysicalTool, Pose, Position3D, Quaternion, SafetyConstraint, SafetyLevel,
    SafetyMetadata, ServerInfo, SetWorkspaceParams, SetWorkspaceResult, ShutdownResult,
    SubscribeContextParams, SubscribeContextResult, ToolProgressParams, ToolState,
    UnsubscribeContextParams, UnsubscribeContextResult, ViolationAction, WorkspaceObject,
};
