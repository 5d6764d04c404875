//! Shell exec tool
//!
//! Runs a command through `sh -c` inside the workspace with a timeout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::core::{Result, ToolDefinition, ToolParameter};
use crate::tools::builtin::truncate_chars;
use crate::tools::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_STREAM_CHARS: usize = 20_000;

/// Tool for running shell commands
pub struct ExecTool {
    workspace: PathBuf,
}

impl ExecTool {
    pub fn new(workspace: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
        }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::from_parameters(
            "exec",
            "Run a shell command in the workspace and return its exit code, stdout and stderr.",
            &[
                ToolParameter::string("command", "The shell command to execute"),
                ToolParameter::integer("timeout_secs", "Timeout in seconds (default 30)").optional(),
            ],
        )
    }

    pub async fn run(&self, args: serde_json::Value) -> Result<String> {
        let Some(command) = args["command"].as_str().filter(|c| !c.trim().is_empty()) else {
            return Ok("Error: missing required argument 'command'".to_string());
        };
        let timeout = Duration::from_secs(args["timeout_secs"].as_u64().unwrap_or(DEFAULT_TIMEOUT_SECS));

        debug!(command, "running shell command");
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.workspace)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Ok(format!("Error: failed to start command: {}", e)),
            Err(_) => return Ok(format!("Error: command timed out after {}s", timeout.as_secs())),
        };

        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());

        Ok(format!(
            "exit code: {}\nstdout:\n{}\nstderr:\n{}",
            code,
            truncate_chars(&String::from_utf8_lossy(&output.stdout), MAX_STREAM_CHARS),
            truncate_chars(&String::from_utf8_lossy(&output.stderr), MAX_STREAM_CHARS),
        ))
    }

    pub fn into_tool(self) -> Tool {
        let this = Arc::new(self);
        Tool::new(Self::definition(), move |args| {
            let this = this.clone();
            async move { this.run(args).await }
        })
    }
}
