//! Wire-codec and domain-type round-trip tests.

use arp_sdk::shared::codec::{encode_frame, parse_frame, Frame};
use arp_sdk::types::{
    ConstraintType, ContextDataType, ContextSource, JSONRPCNotification, JSONRPCRequest,
    PhysicalTool, SafetyConstraint, SafetyLevel, SafetyMetadata, ViolationAction,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn physical_tool_roundtrip_with_all_fields() {
    let tool = PhysicalTool::new("move_to", "Move the arm to a target position")
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "target": {"type": "array", "items": {"type": "number"}}
            },
            "required": ["target"]
        }))
        .with_safety(
            SafetyMetadata::new(SafetyLevel::Normal)
                .with_description("Moves within workspace")
                .with_reversible(true),
        )
        .with_estimated_duration(2.0);

    let text = serde_json::to_string(&tool).unwrap();
    let back: PhysicalTool = serde_json::from_str(&text).unwrap();
    assert_eq!(back, tool);
}

#[test]
fn physical_tool_optional_fields_elide() {
    let tool = PhysicalTool::new("go_home", "Return home");
    let value = serde_json::to_value(&tool).unwrap();
    assert!(value.get("estimatedDuration").is_none());
    assert!(value.get("preconditions").is_none());
    assert!(value.get("effects").is_none());

    // A descriptor without the optional fields parses back to an equal value.
    let back: PhysicalTool = serde_json::from_value(value).unwrap();
    assert_eq!(back, tool);
}

#[test]
fn context_source_roundtrip() {
    let source = ContextSource::new("joint_states", "Joint angles", ContextDataType::Joints)
        .with_update_rate(10.0)
        .with_schema(json!({"type": "object"}));
    let text = serde_json::to_string(&source).unwrap();
    let back: ContextSource = serde_json::from_str(&text).unwrap();
    assert_eq!(back, source);
}

#[test]
fn constraint_roundtrip_matches_wire_form() {
    let text = r#"{
        "name": "workspace_boundary",
        "type": "workspace_bound",
        "enabled": true,
        "priority": 100,
        "parameters": {"min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 1.5], "frame": "world"},
        "violationAction": "reject"
    }"#;
    let constraint: SafetyConstraint = serde_json::from_str(text).unwrap();
    assert_eq!(constraint.constraint_type, ConstraintType::WorkspaceBound);
    assert_eq!(constraint.violation_action, ViolationAction::Reject);

    let back: SafetyConstraint =
        serde_json::from_str(&serde_json::to_string(&constraint).unwrap()).unwrap();
    assert_eq!(back, constraint);
}

#[test]
fn frame_classification_by_shape() {
    let request = parse_frame(r#"{"jsonrpc":"2.0","id":1,"method":"arp.listTools"}"#).unwrap();
    assert!(matches!(request, Frame::Request(_)));

    let notification =
        parse_frame(r#"{"jsonrpc":"2.0","method":"arp.contextUpdate","params":{}}"#).unwrap();
    assert!(matches!(notification, Frame::Notification(_)));

    let response = parse_frame(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-40003,"message":"x"}}"#)
        .unwrap();
    assert!(matches!(response, Frame::Response(_)));
}

proptest! {
    #[test]
    fn request_frames_roundtrip(id in any::<i64>(), method in "[a-z.]{1,24}") {
        let request = JSONRPCRequest::new(id, method, json!({"k": 1}));
        let text = encode_frame(&request).unwrap();
        prop_assert_eq!(parse_frame(&text).unwrap(), Frame::Request(request));
    }

    #[test]
    fn notification_frames_roundtrip(method in "[a-zA-Z.]{1,24}") {
        let notification = JSONRPCNotification::new(method, json!({"reason": "test"}));
        let text = encode_frame(&notification).unwrap();
        prop_assert_eq!(parse_frame(&text).unwrap(), Frame::Notification(notification));
    }

    #[test]
    fn constraints_roundtrip(
        name in "[a-z_]{1,16}",
        type_idx in 0usize..6,
        action_idx in 0usize..3,
        enabled in any::<bool>(),
        priority in -1000i64..1000,
    ) {
        let types = [
            ConstraintType::VelocityLimit,
            ConstraintType::WorkspaceBound,
            ConstraintType::ForceLimit,
            ConstraintType::CollisionZone,
            ConstraintType::EmergencyStop,
            ConstraintType::RateLimit,
        ];
        let actions = [
            ViolationAction::Reject,
            ViolationAction::Clamp,
            ViolationAction::EmergencyStop,
        ];

        let mut constraint = SafetyConstraint::new(name, types[type_idx], actions[action_idx])
            .with_priority(priority);
        constraint.enabled = enabled;

        let text = serde_json::to_string(&constraint).unwrap();
        let back: SafetyConstraint = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(back, constraint);
    }
}
