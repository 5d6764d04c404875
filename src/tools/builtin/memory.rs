//! Long-term memory tool
//!
//! Overwrites the memory blob that is injected into every system prompt.

use std::sync::Arc;

use crate::core::{Result, ToolDefinition, ToolParameter};
use crate::memory::MemoryStore;
use crate::tools::Tool;

/// Tool for rewriting long-term memory
pub struct UpdateMemoryTool {
    store: Arc<dyn MemoryStore>,
}

impl UpdateMemoryTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::from_parameters(
            "update_memory",
            "Replace the long-term memory with new content. The memory is shown to you in every \
             future session, so include everything worth keeping: the previous content is discarded.",
            &[ToolParameter::string(
                "content",
                "Complete new memory document (distilled facts, preferences, decisions)",
            )],
        )
    }

    pub async fn run(&self, args: serde_json::Value) -> Result<String> {
        let Some(content) = args["content"].as_str() else {
            return Ok("Error: missing required argument 'content'".to_string());
        };
        self.store.write(content).await?;
        Ok(format!("Memory updated ({} characters)", content.chars().count()))
    }

    pub fn into_tool(self) -> Tool {
        let this = Arc::new(self);
        Tool::new(Self::definition(), move |args| {
            let this = this.clone();
            async move { this.run(args).await }
        })
    }
}
