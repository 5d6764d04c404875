//! Tool registry - manages and dispatches tool calls
//!
//! Tools are plain records (definition + handler) keyed by their unique
//! name. Dispatch is a name lookup at call time. `execute` never fails:
//! every problem is turned into a JSON `{"error": ...}` text so the model
//! can read it and recover.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::core::{CortexError, Result, ToolCall, ToolDefinition};

/// Async handler invoked with the parsed argument object
pub type ToolHandler = Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// A callable capability: its definition plus the handler behind it
#[derive(Clone)]
pub struct Tool {
    definition: ToolDefinition,
    handler: ToolHandler,
}

impl Tool {
    /// Pair a definition with an async handler
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            definition,
            handler: Arc::new(move |args| handler(args).boxed()),
        }
    }

    /// Unique name of the tool
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Declarative definition sent to the model
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

/// Encode an error message the way every failed tool call is reported
pub fn error_payload(message: impl Into<String>) -> String {
    serde_json::json!({ "error": message.into() }).to_string()
}

/// Registry of available tools, in registration order
///
/// The registration set is meant to be fixed before any agent runs; it is
/// shared read-only (behind an `Arc`) between a parent agent and its
/// sub-agents.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        if self.contains(tool.name()) {
            return Err(CortexError::DuplicateTool(tool.name().to_string()));
        }
        debug!(tool = tool.name(), "registered tool");
        self.tools.push(tool);
        Ok(())
    }

    /// Remove a tool. Returns whether it existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.tools.len();
        self.tools.retain(|t| t.name() != name);
        self.tools.len() != before
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Check whether a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool definitions
    pub fn all_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Definitions allowed by `allowlist`, in registration order.
    /// An empty allowlist allows everything.
    pub fn filtered_definitions(&self, allowlist: &[String]) -> Vec<ToolDefinition> {
        if allowlist.is_empty() {
            return self.all_definitions();
        }
        self.tools
            .iter()
            .filter(|t| allowlist.iter().any(|name| name == t.name()))
            .map(|t| t.definition.clone())
            .collect()
    }

    /// Execute a tool by name with JSON-encoded arguments.
    ///
    /// Always returns text: the handler output, or an error payload for an
    /// unknown tool, malformed arguments, a handler error or a panic.
    pub async fn execute(&self, name: &str, args_json: &str) -> String {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "model requested unknown tool");
            return error_payload(format!("Unknown tool: {}", name));
        };

        let args = if args_json.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str::<serde_json::Value>(args_json) {
                Ok(value) => value,
                Err(e) => {
                    warn!(tool = name, error = %e, "malformed tool arguments");
                    return error_payload(format!("Invalid arguments for {}: {}", name, e));
                }
            }
        };

        debug!(tool = name, "executing tool");
        let handler = tool.handler.clone();
        let outcome = AssertUnwindSafe(async move { handler(args).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "tool handler failed");
                error_payload(e.to_string())
            }
            Err(_) => {
                warn!(tool = name, "tool handler panicked");
                error_payload(format!("Tool {} panicked", name))
            }
        }
    }

    /// Execute a tool call produced by the model
    pub async fn execute_call(&self, call: &ToolCall) -> String {
        self.execute(&call.name, &call.arguments).await
    }
}
