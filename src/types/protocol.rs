//! ARP protocol-specific types.
//!
//! This module contains the domain vocabulary of the Autonomous Robot
//! Protocol -- physical tools, context sources, safety constraints -- plus
//! the request, response, and notification parameter types for every
//! `arp.*` method. Field names are camelCase on the wire; tagged
//! enumerations serialize as their lowercase string forms.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The map of named arguments supplied to a tool invocation.
///
/// Tool arguments arrive as an open JSON object whose shape depends on the
/// tool; the session layer treats it as opaque and hands it to the handler.
pub type ArgumentMap = serde_json::Map<String, Value>;

/// Method names used on the wire.
pub mod methods {
    /// Session handshake.
    pub const INITIALIZE: &str = "arp.initialize";
    /// Session teardown (subscriptions cancelled, initialized flag cleared).
    pub const SHUTDOWN: &str = "arp.shutdown";
    /// Tool discovery.
    pub const LIST_TOOLS: &str = "arp.listTools";
    /// Tool invocation.
    pub const CALL_TOOL: &str = "arp.callTool";
    /// Cooperative cancellation of a live call.
    pub const CANCEL_TOOL: &str = "arp.cancelTool";
    /// Context-source discovery.
    pub const LIST_CONTEXT: &str = "arp.listContext";
    /// Start a context stream.
    pub const SUBSCRIBE_CONTEXT: &str = "arp.subscribeContext";
    /// Stop a context stream.
    pub const UNSUBSCRIBE_CONTEXT: &str = "arp.unsubscribeContext";
    /// Constraint discovery.
    pub const LIST_CONSTRAINTS: &str = "arp.listConstraints";
    /// Fetch one constraint by name.
    pub const GET_CONSTRAINT: &str = "arp.getConstraint";
    /// Declare the active workspace.
    pub const SET_WORKSPACE: &str = "arp.setWorkspace";
    /// Tool progress notification.
    pub const TOOL_PROGRESS: &str = "arp.toolProgress";
    /// Context stream update notification.
    pub const CONTEXT_UPDATE: &str = "arp.contextUpdate";
    /// Out-of-band emergency stop notification.
    pub const EMERGENCY_STOP: &str = "arp.emergencyStop";
}

// --- Enumerations ---

/// Advisory safety level of a physical tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    /// Routine actuation.
    Normal,
    /// Heightened caution (e.g. gripper actuation near objects).
    Elevated,
    /// Dangerous actuation; typically paired with `requires_confirmation`.
    Critical,
}

/// The state of one tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolState {
    /// Registered, no live call.
    Idle,
    /// Admitted and dispatched to the handler.
    Running,
    /// Handler returned successfully.
    Completed,
    /// Handler raised.
    Failed,
    /// Cancelled explicitly or by emergency stop while active.
    Cancelled,
}

impl ToolState {
    /// Lowercase wire form, e.g. `"running"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ToolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of data a context source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDataType {
    /// 6-DOF pose.
    Pose,
    /// Joint positions.
    Joints,
    /// Point cloud.
    Pointcloud,
    /// Camera image.
    Image,
    /// Inertial measurement.
    Imu,
    /// Anything else.
    Custom,
}

/// Kind of safety constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    /// Cap on commanded velocity.
    VelocityLimit,
    /// Axis-aligned workspace boundary.
    WorkspaceBound,
    /// Cap on applied force.
    ForceLimit,
    /// Keep-out region.
    CollisionZone,
    /// Emergency-stop policy.
    EmergencyStop,
    /// Invocation rate cap.
    RateLimit,
}

/// What to do when a constraint is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationAction {
    /// Refuse the invocation.
    Reject,
    /// Clamp the offending argument.
    Clamp,
    /// Trip the emergency stop.
    EmergencyStop,
}

// --- Geometry ---

/// A point in 3-space, meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// Unit quaternion orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// W component.
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// A pose: position plus optional orientation in a named frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position.
    pub position: Position3D,
    /// Orientation, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Quaternion>,
    /// Coordinate frame name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
}

/// An axis-aligned bounding box in a named frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Geometry kind tag; `"box"`.
    #[serde(rename = "type", default = "default_box_type")]
    pub kind: String,
    /// Minimum corner `[x, y, z]`.
    pub min: [f64; 3],
    /// Maximum corner `[x, y, z]`.
    pub max: [f64; 3],
    /// Coordinate frame, default `"world"`.
    #[serde(default = "default_world_frame")]
    pub frame: String,
}

fn default_box_type() -> String {
    "box".to_string()
}

fn default_world_frame() -> String {
    "world".to_string()
}

/// A named object present in the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceObject {
    /// Object name.
    pub name: String,
    /// Object pose, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
    /// Object kind tag, default `"static"`.
    #[serde(rename = "type", default = "default_static_type")]
    pub kind: String,
}

fn default_static_type() -> String {
    "static".to_string()
}

// --- Safety metadata ---

/// Safety metadata attached to a physical tool.
///
/// # Examples
///
/// ```rust
/// use arp_sdk::types::{SafetyLevel, SafetyMetadata};
///
/// let safety = SafetyMetadata::new(SafetyLevel::Critical)
///     .with_requires_confirmation(true)
///     .with_description("Actuates the cutter");
/// assert!(safety.requires_confirmation);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyMetadata {
    /// Advisory level.
    pub level: SafetyLevel,
    /// If true, invocation is rejected until a higher layer confirms.
    #[serde(default)]
    pub requires_confirmation: bool,
    /// Whether the action can be undone.
    #[serde(default = "default_true")]
    pub reversible: bool,
    /// Free-text note.
    #[serde(default)]
    pub description: String,
}

fn default_true() -> bool {
    true
}

impl SafetyMetadata {
    /// Create metadata at the given level with defaults.
    pub fn new(level: SafetyLevel) -> Self {
        Self {
            level,
            requires_confirmation: false,
            reversible: true,
            description: String::new(),
        }
    }

    /// Set the requires-confirmation flag.
    #[must_use]
    pub fn with_requires_confirmation(mut self, requires: bool) -> Self {
        self.requires_confirmation = requires;
        self
    }

    /// Set the reversible flag.
    #[must_use]
    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A declared precondition on a tool. Opaque to the session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// State field inspected.
    pub field: String,
    /// Comparison operator.
    pub operator: String,
    /// Comparand.
    pub value: Value,
}

/// A declared effect of a tool. Opaque to the session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// State field affected.
    pub field: String,
    /// Action applied to the field.
    pub action: String,
    /// New value, if any.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

// --- Physical tools ---

/// Immutable descriptor of a physical tool.
///
/// The parameter schema is an opaque document; the session layer never
/// validates arguments against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalTool {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Parameter schema document.
    #[serde(default)]
    pub parameters: Value,
    /// Safety metadata.
    pub safety: SafetyMetadata,
    /// Declared preconditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<Condition>,
    /// Declared effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    /// Estimated duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
}

impl PhysicalTool {
    /// Create a tool descriptor with normal safety and no schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Value::Object(serde_json::Map::new()),
            safety: SafetyMetadata::new(SafetyLevel::Normal),
            preconditions: Vec::new(),
            effects: Vec::new(),
            estimated_duration: None,
        }
    }

    /// Set the parameter schema document.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the safety metadata.
    #[must_use]
    pub fn with_safety(mut self, safety: SafetyMetadata) -> Self {
        self.safety = safety;
        self
    }

    /// Set the estimated duration in seconds.
    #[must_use]
    pub fn with_estimated_duration(mut self, seconds: f64) -> Self {
        self.estimated_duration = Some(seconds);
        self
    }
}

// --- Context sources ---

/// Immutable descriptor of a context source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSource {
    /// Unique source name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Kind of data produced.
    pub data_type: ContextDataType,
    /// Coordinate frame of the data, if spatial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate_frame: Option<String>,
    /// Nominal update rate in Hz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_rate: Option<f64>,
    /// Payload schema document.
    #[serde(rename = "schema", skip_serializing_if = "Option::is_none")]
    pub schema_def: Option<Value>,
}

impl ContextSource {
    /// Create a source descriptor.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        data_type: ContextDataType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            data_type,
            coordinate_frame: None,
            update_rate: None,
            schema_def: None,
        }
    }

    /// Set the coordinate frame.
    #[must_use]
    pub fn with_coordinate_frame(mut self, frame: impl Into<String>) -> Self {
        self.coordinate_frame = Some(frame.into());
        self
    }

    /// Set the nominal update rate in Hz.
    #[must_use]
    pub fn with_update_rate(mut self, hz: f64) -> Self {
        self.update_rate = Some(hz);
        self
    }

    /// Set the payload schema document.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema_def = Some(schema);
        self
    }
}

// --- Safety constraints ---

/// A safety constraint gating tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyConstraint {
    /// Unique constraint name.
    pub name: String,
    /// Constraint type; unknown-to-the-evaluator types are listed but inert.
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    /// Whether the constraint participates in evaluation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Evaluation priority (informational; evaluation is registration order).
    #[serde(default)]
    pub priority: i64,
    /// Type-specific parameter map.
    #[serde(default)]
    pub parameters: ArgumentMap,
    /// What a violation does.
    pub violation_action: ViolationAction,
}

impl SafetyConstraint {
    /// Create an enabled constraint with empty parameters.
    pub fn new(
        name: impl Into<String>,
        constraint_type: ConstraintType,
        violation_action: ViolationAction,
    ) -> Self {
        Self {
            name: name.into(),
            constraint_type,
            enabled: true,
            priority: 0,
            parameters: ArgumentMap::new(),
            violation_action,
        }
    }

    /// Set the parameter map.
    #[must_use]
    pub fn with_parameters(mut self, parameters: ArgumentMap) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Disable the constraint.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// --- Handshake ---

/// Client implementation info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

/// Server implementation info, including the robot it fronts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Robot model, e.g. `"Simulated 6-DOF Arm"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot_model: Option<String>,
    /// Robot type, e.g. `"manipulator"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot_type: Option<String>,
}

/// Advertised optional capabilities.
///
/// Planning and confirmation are sub-protocols above the session layer;
/// the core advertises them as `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Physical tools are available.
    #[serde(default = "default_true")]
    pub tools: bool,
    /// Context streaming is available.
    #[serde(default = "default_true")]
    pub context: bool,
    /// Safety constraints are listed.
    #[serde(default = "default_true")]
    pub constraints: bool,
    /// Planning sub-protocol.
    #[serde(default)]
    pub planning: bool,
    /// Confirmation sub-protocol.
    #[serde(default)]
    pub confirmation: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            tools: true,
            context: true,
            constraints: true,
            planning: false,
            confirmation: false,
        }
    }
}

/// `arp.initialize` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version the client speaks.
    pub protocol_version: String,
    /// Client implementation info.
    pub client_info: ClientInfo,
    /// Client-declared capabilities.
    #[serde(default)]
    pub capabilities: Capabilities,
}

/// `arp.initialize` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version the server speaks.
    pub protocol_version: String,
    /// Server implementation info.
    pub server_info: ServerInfo,
    /// Server capabilities.
    pub capabilities: Capabilities,
}

/// `arp.shutdown` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownResult {
    /// Always `"ok"`.
    pub status: String,
}

// --- Tool invocation ---

/// `arp.callTool` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolParams {
    /// Tool name.
    pub name: String,
    /// Caller-supplied call id; the server generates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Open argument map handed to the handler.
    #[serde(default)]
    pub arguments: ArgumentMap,
}

/// `arp.callTool` result.
///
/// A handler failure is reported here with `state: failed`, not as a
/// JSON-RPC error; protocol-level rejections never produce this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// The admitted call id.
    pub call_id: String,
    /// Terminal state of the call.
    pub state: ToolState,
    /// Handler return value on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Handler error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the handler in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// `arp.cancelTool` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelToolParams {
    /// Call id to cancel.
    pub call_id: String,
}

/// `arp.cancelTool` result.
///
/// `state` is `"cancelled"` for a known call id and `"not_found"` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelToolResult {
    /// The call id from the request.
    pub call_id: String,
    /// `"cancelled"` or `"not_found"`.
    pub state: String,
}

/// `arp.toolProgress` notification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProgressParams {
    /// Call id the progress belongs to.
    pub call_id: String,
    /// Fraction complete in `[0, 1]`, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Human-readable progress message.
    #[serde(default)]
    pub message: String,
    /// Call state at emission time.
    pub state: ToolState,
}

// --- Discovery results ---

/// `arp.listTools` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Registered tools in registration order.
    pub tools: Vec<PhysicalTool>,
}

/// `arp.listContext` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListContextResult {
    /// Registered context sources in registration order.
    pub sources: Vec<ContextSource>,
}

/// `arp.listConstraints` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConstraintsResult {
    /// Registered constraints in registration order.
    pub constraints: Vec<SafetyConstraint>,
}

/// `arp.getConstraint` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetConstraintParams {
    /// Constraint name.
    pub name: String,
}

// --- Context subscription ---

/// `arp.subscribeContext` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeContextParams {
    /// Context source name.
    pub name: String,
    /// Client-requested rate cap in Hz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<f64>,
}

/// `arp.subscribeContext` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeContextResult {
    /// The subscribed source name.
    pub subscribed: String,
}

/// `arp.unsubscribeContext` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribeContextParams {
    /// Context source name.
    pub name: String,
}

/// `arp.unsubscribeContext` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribeContextResult {
    /// The unsubscribed source name.
    pub unsubscribed: String,
}

/// `arp.contextUpdate` notification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextUpdateParams {
    /// Source name.
    pub name: String,
    /// UTC ISO-8601 timestamp of the sample.
    pub timestamp: String,
    /// Sampled value, or `{"error": …}` as a terminal marker when the
    /// provider failed.
    pub data: Value,
}

// --- Workspace ---

/// `arp.setWorkspace` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWorkspaceParams {
    /// Workspace name.
    pub name: String,
    /// Workspace bounds.
    pub bounds: BoundingBox,
    /// Known objects inside the workspace.
    #[serde(default)]
    pub objects: Vec<WorkspaceObject>,
}

/// `arp.setWorkspace` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWorkspaceResult {
    /// Always `"ok"`.
    pub status: String,
    /// The workspace name from the request.
    pub workspace: String,
}

// --- Emergency stop ---

/// `arp.emergencyStop` notification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyStopParams {
    /// Why the stop was triggered.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(SafetyLevel::Elevated).unwrap(),
            json!("elevated")
        );
        assert_eq!(
            serde_json::to_value(ToolState::Running).unwrap(),
            json!("running")
        );
        assert_eq!(
            serde_json::to_value(ConstraintType::WorkspaceBound).unwrap(),
            json!("workspace_bound")
        );
        assert_eq!(
            serde_json::to_value(ViolationAction::EmergencyStop).unwrap(),
            json!("emergency_stop")
        );
        assert_eq!(
            serde_json::to_value(ContextDataType::Pointcloud).unwrap(),
            json!("pointcloud")
        );
    }

    #[test]
    fn tool_serializes_camel_case() {
        let tool = PhysicalTool::new("move_to", "Move the arm")
            .with_safety(SafetyMetadata::new(SafetyLevel::Normal))
            .with_estimated_duration(2.0);
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["estimatedDuration"], json!(2.0));
        assert_eq!(value["safety"]["requiresConfirmation"], json!(false));
        // Empty precondition/effect lists are elided.
        assert!(value.get("preconditions").is_none());
    }

    #[test]
    fn tool_roundtrip() {
        let tool = PhysicalTool::new("pick_up", "Close the gripper")
            .with_parameters(json!({
                "type": "object",
                "properties": {"object_id": {"type": "string"}}
            }))
            .with_safety(
                SafetyMetadata::new(SafetyLevel::Elevated).with_description("Actuates gripper"),
            )
            .with_estimated_duration(1.0);
        let text = serde_json::to_string(&tool).unwrap();
        let back: PhysicalTool = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tool);
    }

    #[test]
    fn context_source_roundtrip() {
        let source = ContextSource::new("odometry", "End-effector pose", ContextDataType::Pose)
            .with_coordinate_frame("world")
            .with_update_rate(10.0);
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["dataType"], json!("pose"));
        assert_eq!(value["coordinateFrame"], json!("world"));
        let back: ContextSource = serde_json::from_value(value).unwrap();
        assert_eq!(back, source);
    }

    #[test]
    fn constraint_defaults() {
        let text = r#"{"name":"ws","type":"workspace_bound","violationAction":"reject"}"#;
        let constraint: SafetyConstraint = serde_json::from_str(text).unwrap();
        assert!(constraint.enabled);
        assert_eq!(constraint.priority, 0);
        assert!(constraint.parameters.is_empty());
    }

    #[test]
    fn call_tool_params_optional_fields() {
        let text = r#"{"name":"go_home"}"#;
        let params: CallToolParams = serde_json::from_str(text).unwrap();
        assert_eq!(params.name, "go_home");
        assert!(params.call_id.is_none());
        assert!(params.arguments.is_empty());
    }

    #[test]
    fn call_tool_result_elides_absent_fields() {
        let result = CallToolResult {
            call_id: "c1".to_string(),
            state: ToolState::Failed,
            result: None,
            error: Some("simulated failure".to_string()),
            duration: Some(0.25),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["state"], json!("failed"));
        assert!(value.get("result").is_none());
        assert_eq!(value["callId"], json!("c1"));
    }

    #[test]
    fn capabilities_default() {
        let caps = Capabilities::default();
        assert!(caps.tools && caps.context && caps.constraints);
        assert!(!caps.planning && !caps.confirmation);
        let parsed: Capabilities = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, caps);
    }

    #[test]
    fn bounding_box_defaults() {
        let text = r#"{"min":[-1.0,-1.0,0.0],"max":[1.0,1.0,1.5]}"#;
        let bounds: BoundingBox = serde_json::from_str(text).unwrap();
        assert_eq!(bounds.kind, "box");
        assert_eq!(bounds.frame, "world");
    }
}
