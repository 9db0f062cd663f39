//! Safety constraint evaluation.
//!
//! A pure, synchronous check run at admission time, before a tool handler
//! is dispatched. The evaluator inspects well-known argument names
//! (`target`, `velocity`, `speed`) rather than tool identities: it is a
//! trust boundary between the protocol and the robot's physical model, and
//! handlers must still enforce their own preconditions.

use crate::types::{ArgumentMap, ConstraintType, SafetyConstraint};
use serde_json::Value;

/// Evaluate the enabled constraints against a tool invocation, in
/// registration order. Returns the first violation found.
///
/// Only `workspace_bound` and `velocity_limit` are enforced; the remaining
/// constraint types are listed to clients but inert here.
///
/// # Examples
///
/// ```rust
/// use arp_sdk::server::constraints::evaluate;
/// use arp_sdk::types::{ConstraintType, SafetyConstraint, ViolationAction};
///
/// let constraint = SafetyConstraint::new(
///     "workspace",
///     ConstraintType::WorkspaceBound,
///     ViolationAction::Reject,
/// )
/// .with_parameters(
///     serde_json::json!({"min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 1.5]})
///         .as_object()
///         .cloned()
///         .unwrap(),
/// );
///
/// let args = serde_json::json!({"target": [5.0, 0.0, 0.0]})
///     .as_object()
///     .cloned()
///     .unwrap();
/// let violation = evaluate("move_to", &args, std::slice::from_ref(&constraint));
/// assert!(violation.unwrap().contains("workspace"));
/// ```
pub fn evaluate(
    _tool_name: &str,
    arguments: &ArgumentMap,
    constraints: &[SafetyConstraint],
) -> Option<String> {
    for constraint in constraints.iter().filter(|c| c.enabled) {
        let violation = match constraint.constraint_type {
            ConstraintType::WorkspaceBound => check_workspace_bound(arguments, constraint),
            ConstraintType::VelocityLimit => check_velocity_limit(arguments, constraint),
            // Listed but not evaluated by the session layer.
            ConstraintType::ForceLimit
            | ConstraintType::CollisionZone
            | ConstraintType::EmergencyStop
            | ConstraintType::RateLimit => None,
        };
        if violation.is_some() {
            return violation;
        }
    }
    None
}

/// `arguments.target`, when it is a sequence of at least three numbers,
/// must lie inside `params.min`/`params.max` per coordinate. Missing
/// bounds default to unbounded.
fn check_workspace_bound(arguments: &ArgumentMap, constraint: &SafetyConstraint) -> Option<String> {
    let target = numeric_sequence(arguments.get("target")?)?;
    if target.len() < 3 {
        return None;
    }

    let mins = constraint.parameters.get("min");
    let maxs = constraint.parameters.get("max");
    for i in 0..3 {
        let min = bound_coordinate(mins, i).unwrap_or(f64::NEG_INFINITY);
        let max = bound_coordinate(maxs, i).unwrap_or(f64::INFINITY);
        if target[i] < min || target[i] > max {
            return Some(format!(
                "Position {target:?} exceeds workspace boundary {}",
                constraint.name
            ));
        }
    }
    None
}

/// `arguments.velocity` (or `speed`), when numeric, must not exceed
/// `params.max_linear`. A missing limit is unbounded.
fn check_velocity_limit(arguments: &ArgumentMap, constraint: &SafetyConstraint) -> Option<String> {
    let velocity = arguments
        .get("velocity")
        .or_else(|| arguments.get("speed"))
        .and_then(Value::as_f64)?;
    let max = constraint
        .parameters
        .get("max_linear")
        .and_then(Value::as_f64)
        .unwrap_or(f64::INFINITY);
    if velocity > max {
        return Some(format!("Velocity {velocity} exceeds limit {max}"));
    }
    None
}

fn numeric_sequence(value: &Value) -> Option<Vec<f64>> {
    let items = value.as_array()?;
    let numbers: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
    (numbers.len() == items.len()).then_some(numbers)
}

fn bound_coordinate(bound: Option<&Value>, index: usize) -> Option<f64> {
    bound?.as_array()?.get(index)?.as_f64()
}
