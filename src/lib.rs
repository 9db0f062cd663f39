//! # ARP SDK for Rust
//!
//! An implementation of the Autonomous Robot Protocol (ARP): a
//! bidirectional request/response-plus-notification protocol that lets an
//! external agent -- typically an LLM-driven planner -- discover and invoke
//! the physical capabilities of a robot under explicit, enforceable safety
//! constraints.
//!
//! A [`server::Server`] represents one robot and exposes named physical
//! tools (actions that actuate), named context sources (periodically
//! sampled sensor streams), and a registry of safety constraints that gate
//! tool invocation. A [`client::Client`] performs capability discovery,
//! invokes tools, subscribes to context streams, and can trigger an
//! out-of-band emergency stop. Transport is framed JSON-RPC 2.0 over
//! WebSocket, one text frame per message.
//!
//! ## Safety model
//!
//! Every `arp.callTool` passes admission control before its handler runs:
//! the sticky emergency-stop latch, tool existence, call-id collision, the
//! constraint evaluator (workspace bounds, velocity limits), and the
//! requires-confirmation flag. Protocol rejections come back as JSON-RPC
//! errors; a handler that runs and fails comes back as a normal result
//! with `state: failed` -- so a planner can tell "I asked wrong" from "the
//! robot tried and failed".
//!
//! ## Quick start: a robot server
//!
//! ```rust,no_run
//! use arp_sdk::server::Server;
//! use arp_sdk::types::{
//!     ConstraintType, ContextDataType, ContextSource, PhysicalTool, SafetyConstraint,
//!     SafetyLevel, SafetyMetadata, ViolationAction,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> arp_sdk::Result<()> {
//!     let workspace = SafetyConstraint::new(
//!         "workspace_boundary",
//!         ConstraintType::WorkspaceBound,
//!         ViolationAction::Reject,
//!     )
//!     .with_parameters(
//!         json!({"min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 1.5]})
//!             .as_object()
//!             .cloned()
//!             .unwrap(),
//!     );
//!
//!     let server = Server::builder()
//!         .name("sim-robot-arm")
//!         .version("0.1.0")
//!         .robot_model("Simulated 6-DOF Arm")
//!         .robot_type("manipulator")
//!         .tool(
//!             PhysicalTool::new("move_to", "Move the end-effector to [x, y, z]")
//!                 .with_safety(SafetyMetadata::new(SafetyLevel::Normal))
//!                 .with_estimated_duration(2.0),
//!             |args: serde_json::Value, _extra| async move {
//!                 Ok(json!({"reached": args["target"]}))
//!             },
//!         )
//!         .context_source(
//!             ContextSource::new("odometry", "End-effector pose", ContextDataType::Pose)
//!                 .with_update_rate(10.0),
//!             || async { Ok(json!({"position": {"x": 0.0, "y": 0.0, "z": 0.5}})) },
//!         )
//!         .constraint(workspace)
//!         .build();
//!
//!     server.run().await
//! }
//! ```
//!
//! ## Quick start: a planner client
//!
//! ```rust,no_run
//! use arp_sdk::client::Client;
//! use serde_json::json;
//!
//! # async fn example() -> arp_sdk::Result<()> {
//! let client = Client::connect("ws://localhost:8765").await?;
//! client.initialize().await?;
//!
//! for tool in client.list_tools().await? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//!
//! let result = client
//!     .call_tool("move_to", json!({"target": [0.5, 0.3, 0.2]}))
//!     .await?;
//! assert_eq!(result.state.as_str(), "completed");
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod client;
pub mod error;
pub mod server;
pub mod shared;
pub mod types;

pub use error::{Error, ErrorCode, Result, TransportError};

pub use client::Client;
pub use server::{
    ContextProvider, RequestHandlerExtra, Server, ServerBuilder, ToolHandler,
};
pub use types::{
    CallToolResult, Capabilities, ClientInfo, ConstraintType, ContextDataType, ContextSource,
    ContextUpdateParams, PhysicalTool, SafetyConstraint, SafetyLevel, SafetyMetadata, ServerInfo,
    ToolProgressParams, ToolState, ViolationAction,
};

/// The ARP protocol version this crate speaks.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Default server bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8765;
