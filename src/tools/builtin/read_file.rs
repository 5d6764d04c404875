//! Read file tool
//!
//! Reads a text file, optionally a line window of it. Skill files are read
//! through this tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{Result, ToolDefinition, ToolParameter};
use crate::tools::builtin::{resolve_path, truncate_chars};
use crate::tools::Tool;

const MAX_OUTPUT_CHARS: usize = 50_000;

/// Tool for reading files
pub struct ReadFileTool {
    workspace: PathBuf,
}

impl ReadFileTool {
    pub fn new(workspace: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
        }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::from_parameters(
            "read_file",
            "Read a text file. Relative paths resolve against the workspace.",
            &[
                ToolParameter::string("path", "Path of the file to read"),
                ToolParameter::integer("offset", "First line to return (1-based)").optional(),
                ToolParameter::integer("limit", "Maximum number of lines to return").optional(),
            ],
        )
    }

    pub async fn run(&self, args: serde_json::Value) -> Result<String> {
        let Some(path) = args["path"].as_str() else {
            return Ok("Error: missing required argument 'path'".to_string());
        };
        let full_path = resolve_path(&self.workspace, path);

        let content = match tokio::fs::read_to_string(&full_path).await {
            Ok(c) => c,
            Err(e) => return Ok(format!("Error: cannot read {}: {}", full_path.display(), e)),
        };

        let offset = args["offset"].as_u64().unwrap_or(1).max(1) as usize;
        let limit = args["limit"].as_u64().map(|l| l as usize);

        let selected = if offset == 1 && limit.is_none() {
            content
        } else {
            let lines = content.lines().skip(offset - 1);
            match limit {
                Some(n) => lines.take(n).collect::<Vec<_>>().join("\n"),
                None => lines.collect::<Vec<_>>().join("\n"),
            }
        };

        Ok(truncate_chars(&selected, MAX_OUTPUT_CHARS))
    }

    pub fn into_tool(self) -> Tool {
        let this = Arc::new(self);
        Tool::new(Self::definition(), move |args| {
            let this = this.clone();
            async move { this.run(args).await }
        })
    }
}
