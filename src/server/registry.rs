//! Handler traits and the server's in-memory registries.
//!
//! Three independent insertion-ordered catalogues keyed by unique name:
//! tools (descriptor + handler), context sources (descriptor + provider),
//! and safety constraints. Registration normally happens before `run()`;
//! the maps sit behind locks so late registration cannot corrupt state.

use crate::error::Result;
use crate::server::invocation::RequestHandlerExtra;
use crate::types::{ContextSource, PhysicalTool, SafetyConstraint};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// A physical tool's asynchronous action.
///
/// Returning `Err` is a tool-domain outcome: the invocation engine packages
/// it into a `failed` result rather than a protocol error.
///
/// Any `Fn(Value, RequestHandlerExtra) -> impl Future<Output = Result<Value>>`
/// closure implements this trait, so plain async closures register directly.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with the client-supplied argument object.
    async fn handle(&self, args: Value, extra: RequestHandlerExtra) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Value, RequestHandlerExtra) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value>> + Send,
{
    async fn handle(&self, args: Value, extra: RequestHandlerExtra) -> Result<Value> {
        (self)(args, extra).await
    }
}

/// A context source's asynchronous value producer.
///
/// Any `Fn() -> impl Future<Output = Result<Value>>` closure implements
/// this trait.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Produce the current value of the source.
    async fn sample(&self) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> ContextProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value>> + Send,
{
    async fn sample(&self) -> Result<Value> {
        (self)().await
    }
}

/// A registered tool: immutable descriptor plus owned handler.
#[derive(Clone)]
pub struct ToolEntry {
    /// Descriptor advertised by `arp.listTools`.
    pub descriptor: PhysicalTool,
    /// The action dispatched on `arp.callTool`.
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A registered context source: immutable descriptor plus owned provider.
#[derive(Clone)]
pub struct ContextEntry {
    /// Descriptor advertised by `arp.listContext`.
    pub descriptor: ContextSource,
    /// The producer sampled by the subscription engine.
    pub provider: Arc<dyn ContextProvider>,
}

impl std::fmt::Debug for ContextEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// The server's three catalogues.
#[derive(Default)]
pub struct Registries {
    tools: RwLock<IndexMap<String, ToolEntry>>,
    sources: RwLock<IndexMap<String, ContextEntry>>,
    constraints: RwLock<IndexMap<String, SafetyConstraint>>,
}

impl Registries {
    /// Create empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its descriptor name. Re-registering a name
    /// replaces the previous entry.
    pub fn insert_tool(&self, descriptor: PhysicalTool, handler: Arc<dyn ToolHandler>) {
        let name = descriptor.name.clone();
        self.tools.write().insert(name, ToolEntry { descriptor, handler });
    }

    /// Register a context source under its descriptor name.
    pub fn insert_source(&self, descriptor: ContextSource, provider: Arc<dyn ContextProvider>) {
        let name = descriptor.name.clone();
        self.sources
            .write()
            .insert(name, ContextEntry { descriptor, provider });
    }

    /// Register a safety constraint.
    pub fn insert_constraint(&self, constraint: SafetyConstraint) {
        self.constraints
            .write()
            .insert(constraint.name.clone(), constraint);
    }

    /// Look up a tool entry by name.
    pub fn tool(&self, name: &str) -> Option<ToolEntry> {
        self.tools.read().get(name).cloned()
    }

    /// Look up a context entry by name.
    pub fn source(&self, name: &str) -> Option<ContextEntry> {
        self.sources.read().get(name).cloned()
    }

    /// Look up a constraint by name.
    pub fn constraint(&self, name: &str) -> Option<SafetyConstraint> {
        self.constraints.read().get(name).cloned()
    }

    /// Tool descriptors in registration order.
    pub fn list_tools(&self) -> Vec<PhysicalTool> {
        self.tools
            .read()
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Context source descriptors in registration order.
    pub fn list_sources(&self) -> Vec<ContextSource> {
        self.sources
            .read()
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Constraints in registration order.
    pub fn list_constraints(&self) -> Vec<SafetyConstraint> {
        self.constraints.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for Registries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registries").finish_non_exhaustive()
    }
}
