//! Sub-agent delegation
//!
//! The `sessions_spawn` tool runs a brand-new agent to completion and
//! returns its final answer as the tool result. The child shares the
//! parent's provider and tool registry but starts with an empty history.
//!
//! The handler learns who its parent is from a task-local scope that the
//! running agent sets around every tool call. The scope also carries the
//! nesting depth and the parent's spawn counter, which enforce the
//! optional `DelegationLimits`.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::agent::orchestrator::Agent;
use crate::core::config::{CompactionConfig, DelegationConfig};
use crate::core::{AgentConfig, Result, ToolDefinition, ToolParameter};
use crate::llm::{LLMProvider, SanitizerRegistry};
use crate::skills::SkillMeta;
use crate::tools::{Tool, ToolRegistry};

/// Name of the delegation tool
pub const SPAWN_TOOL_NAME: &str = "sessions_spawn";

tokio::task_local! {
    static PARENT: ParentContext;
}

/// What a running agent exposes to the tools it calls
#[derive(Clone)]
pub(crate) struct ParentContext {
    pub config: AgentConfig,
    pub llm: Arc<dyn LLMProvider>,
    pub registry: Arc<ToolRegistry>,
    pub sanitizers: Arc<SanitizerRegistry>,
    pub max_context_tokens: usize,
    pub compaction: Option<CompactionConfig>,
    pub skills: Vec<SkillMeta>,
    pub depth: usize,
    /// Sub-agents spawned so far in the parent's current run
    pub children: Arc<AtomicUsize>,
}

/// Run `fut` with `parent` visible to delegation tools
pub(crate) async fn with_parent<F: Future>(parent: ParentContext, fut: F) -> F::Output {
    PARENT.scope(parent, fut).await
}

/// Optional caps on recursive delegation. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelegationLimits {
    /// Deepest allowed nesting; a top-level agent is depth 0
    pub max_depth: Option<usize>,
    /// Sub-agents one agent may spawn during a single run
    pub max_children: Option<usize>,
}

impl From<&DelegationConfig> for DelegationLimits {
    fn from(config: &DelegationConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_children: config.max_children,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpawnArgs {
    task: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    allowed_tools: Option<Vec<String>>,
}

/// Definition of the `sessions_spawn` tool
pub fn spawn_definition() -> ToolDefinition {
    ToolDefinition::from_parameters(
        SPAWN_TOOL_NAME,
        "Delegate a self-contained sub-task to a new sub-agent. The sub-agent starts with no \
         knowledge of this conversation, so the task must include everything it needs. \
         Returns the sub-agent's final answer.",
        &[
            ToolParameter::string("task", "Complete description of the sub-task"),
            ToolParameter::string("name", "Display name for the sub-agent").optional(),
            ToolParameter::string("instructions", "Extra instructions for the sub-agent").optional(),
            ToolParameter::string_array(
                "allowed_tools",
                "Tools the sub-agent may use (default: the same as yours)",
            )
            .optional(),
        ],
    )
}

/// Build the `sessions_spawn` tool
pub fn spawn_tool(limits: DelegationLimits) -> Tool {
    Tool::new(spawn_definition(), move |args| spawn_sub_agent(limits, args))
}

/// Register `sessions_spawn` in a registry that is still being set up
pub fn register_spawn_tool(registry: &mut ToolRegistry, limits: DelegationLimits) -> Result<()> {
    registry.register(spawn_tool(limits))
}

async fn spawn_sub_agent(limits: DelegationLimits, args: serde_json::Value) -> Result<String> {
    let Ok(parent) = PARENT.try_with(|p| p.clone()) else {
        return Ok(format!("Error: {} can only be called by a running agent", SPAWN_TOOL_NAME));
    };

    let args: SpawnArgs = match serde_json::from_value(args) {
        Ok(a) => a,
        Err(e) => return Ok(format!("Error: invalid arguments: {}", e)),
    };
    if args.task.trim().is_empty() {
        return Ok("Error: task must not be empty".to_string());
    }

    let depth = parent.depth + 1;
    if let Some(max_depth) = limits.max_depth {
        if depth > max_depth {
            warn!(depth, max_depth, "sub-agent depth limit reached");
            return Ok(format!(
                "Error: sub-agent nesting limit reached (max depth {})",
                max_depth
            ));
        }
    }

    let ordinal = parent.children.fetch_add(1, Ordering::SeqCst) + 1;
    if let Some(max_children) = limits.max_children {
        if ordinal > max_children {
            parent.children.fetch_sub(1, Ordering::SeqCst);
            warn!(max_children, "sub-agent spawn limit reached");
            return Ok(format!(
                "Error: sub-agent limit reached ({} per run)",
                max_children
            ));
        }
    }

    let child_config = child_config(&parent.config, &args, ordinal);
    let child_name = child_config.name.clone();
    info!(parent = %parent.config.name, child = %child_name, depth, "spawning sub-agent");

    let mut child = Agent::new(child_config, parent.llm.clone(), parent.registry.clone())
        .with_max_context_tokens(parent.max_context_tokens)
        .with_skills(parent.skills.clone())
        .with_sanitizers(parent.sanitizers.clone())
        .with_depth(depth);
    if let Some(compaction) = &parent.compaction {
        child = child.with_compaction(compaction);
    }

    match child.run(args.task).await {
        Ok(result) => {
            info!(child = %child_name, iterations = result.iterations, "sub-agent finished");
            Ok(result.response)
        }
        Err(e) => {
            warn!(child = %child_name, error = %e, "sub-agent failed");
            Ok(format!("Error: sub-agent {} failed: {}", child_name, e))
        }
    }
}

/// Settings of a child: the parent's, renamed, with extended instructions
/// and an allowlist that can only narrow the parent's
fn child_config(parent: &AgentConfig, args: &SpawnArgs, ordinal: usize) -> AgentConfig {
    let name = args
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{}-sub-{}", parent.name, ordinal));

    let instructions = match args.instructions.as_deref().map(str::trim) {
        Some(extra) if !extra.is_empty() => format!("{}\n\n{}", parent.instructions, extra),
        _ => parent.instructions.clone(),
    };

    // An empty allowlist means every tool, so a request disjoint from the
    // parent's list keeps the parent's list.
    let allowed_tools = match &args.allowed_tools {
        Some(requested) if !requested.is_empty() => {
            if parent.allowed_tools.is_empty() {
                requested.clone()
            } else {
                let narrowed: Vec<String> = requested
                    .iter()
                    .filter(|t| parent.allowed_tools.contains(t))
                    .cloned()
                    .collect();
                if narrowed.is_empty() {
                    warn!(requested = ?requested, "requested tools are outside the parent's allowlist");
                    parent.allowed_tools.clone()
                } else {
                    narrowed
                }
            }
        }
        _ => parent.allowed_tools.clone(),
    };

    AgentConfig {
        name,
        instructions,
        allowed_tools,
        ..parent.clone()
    }
}
