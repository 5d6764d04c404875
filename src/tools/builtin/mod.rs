//! Built-in tools
//!
//! Small file, shell, search and memory capabilities for the demo front
//! end. Recoverable failures come back as `Error: ...` text.

pub mod exec;
pub mod memory;
pub mod read_file;
pub mod search;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::Result;
use crate::memory::MemoryStore;
use crate::tools::ToolRegistry;

pub use exec::ExecTool;
pub use memory::UpdateMemoryTool;
pub use read_file::ReadFileTool;
pub use search::SearchTextTool;

/// Register every built-in tool. `update_memory` is only added when a
/// memory store is given.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    workspace: &Path,
    memory: Option<Arc<dyn MemoryStore>>,
) -> Result<()> {
    registry.register(ReadFileTool::new(workspace).into_tool())?;
    registry.register(ExecTool::new(workspace).into_tool())?;
    registry.register(SearchTextTool::new(workspace).into_tool())?;
    if let Some(store) = memory {
        registry.register(UpdateMemoryTool::new(store).into_tool())?;
    }
    Ok(())
}

/// Resolve a tool-supplied path against the workspace
pub(crate) fn resolve_path(workspace: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        workspace.join(candidate)
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
