//! Tools module - the tool registry and built-in tools
//!
//! Contains the name-keyed registry the agent dispatches through, plus the
//! built-in file, shell, search and memory tools.

pub mod builtin;
pub mod registry;

pub use registry::{error_payload, Tool, ToolHandler, ToolRegistry};
