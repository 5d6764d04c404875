//! Text search tool
//!
//! Regex search over text files below a workspace directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::core::{CortexError, Result, ToolDefinition, ToolParameter};
use crate::tools::builtin::{resolve_path, truncate_chars};
use crate::tools::Tool;

const DEFAULT_MAX_RESULTS: usize = 50;
const MAX_LINE_CHARS: usize = 300;

/// Tool for searching file contents
pub struct SearchTextTool {
    workspace: PathBuf,
}

impl SearchTextTool {
    pub fn new(workspace: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
        }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::from_parameters(
            "search_text",
            "Search files for a regular expression. Returns `path:line: text` matches.",
            &[
                ToolParameter::string("pattern", "Regular expression to search for"),
                ToolParameter::string("path", "Directory or file to search (default: workspace)")
                    .optional(),
                ToolParameter::integer("max_results", "Maximum number of matches (default 50)")
                    .optional(),
            ],
        )
    }

    pub async fn run(&self, args: serde_json::Value) -> Result<String> {
        let Some(pattern) = args["pattern"].as_str() else {
            return Ok("Error: missing required argument 'pattern'".to_string());
        };
        let regex = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => return Ok(format!("Error: invalid pattern: {}", e)),
        };
        let root = match args["path"].as_str() {
            Some(p) => resolve_path(&self.workspace, p),
            None => self.workspace.clone(),
        };
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);
        let display_base = self.workspace.clone();

        let matches = tokio::task::spawn_blocking(move || {
            let mut matches = Vec::new();
            search_path(&root, &regex, max_results, &mut matches);
            matches
                .into_iter()
                .map(|(path, line, text)| {
                    let shown = path.strip_prefix(&display_base).unwrap_or(&path);
                    format!("{}:{}: {}", shown.display(), line, text)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| CortexError::tool(format!("search task failed: {}", e)))?;

        if matches.is_empty() {
            return Ok(format!("No matches for '{}'", pattern));
        }
        Ok(matches.join("\n"))
    }

    pub fn into_tool(self) -> Tool {
        let this = Arc::new(self);
        Tool::new(Self::definition(), move |args| {
            let this = this.clone();
            async move { this.run(args).await }
        })
    }
}

fn search_path(path: &Path, regex: &Regex, limit: usize, out: &mut Vec<(PathBuf, usize, String)>) {
    if out.len() >= limit {
        return;
    }

    if path.is_file() {
        // Non-UTF-8 files are treated as binary and skipped
        let Ok(content) = fs::read_to_string(path) else {
            return;
        };
        for (idx, line) in content.lines().enumerate() {
            if out.len() >= limit {
                return;
            }
            if regex.is_match(line) {
                out.push((path.to_path_buf(), idx + 1, truncate_chars(line.trim(), MAX_LINE_CHARS)));
            }
        }
        return;
    }

    let Ok(entries) = fs::read_dir(path) else {
        return;
    };
    let mut children: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| !is_ignored(p))
        .collect();
    children.sort();

    for child in children {
        search_path(&child, regex, limit, out);
    }
}

fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') || n == "target" || n == "node_modules")
        .unwrap_or(false)
}
