//! Agent assembly from configuration
//!
//! Wires the built-in tools, delegation, memory, skills and compaction
//! for a top-level agent.

use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::orchestrator::Agent;
use crate::agent::sub_agent::{register_spawn_tool, DelegationLimits};
use crate::core::{Config, Result};
use crate::llm::LLMProvider;
use crate::memory::{FileMemoryStore, MemoryStore};
use crate::skills::discover_skills;
use crate::tools::builtin::register_builtin_tools;
use crate::tools::ToolRegistry;

/// Build a top-level agent for `config`, talking to `llm`
pub fn build_agent(config: &Config, llm: Arc<dyn LLMProvider>) -> Result<Agent> {
    config.validate()?;

    let workspace = config.agent.workspace_root();
    let agent_config = config.agent_config().with_workspace(workspace.clone());

    let memory: Option<Arc<dyn MemoryStore>> = if config.memory.enabled {
        let store = FileMemoryStore::new(config.memory_path());
        debug!(path = %store.path().display(), "long-term memory enabled");
        Some(Arc::new(store))
    } else {
        None
    };

    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, &workspace, memory.clone())?;
    if config.delegation.enabled {
        register_spawn_tool(&mut registry, DelegationLimits::from(&config.delegation))?;
    }

    let skills = if config.skills.enabled {
        discover_skills(&config.skill_directories())
    } else {
        Vec::new()
    };

    info!(
        tools = registry.len(),
        skills = skills.len(),
        workspace = %workspace.display(),
        "agent assembled"
    );

    let mut agent = Agent::new(agent_config, llm, Arc::new(registry))
        .with_max_context_tokens(config.context.max_context_tokens)
        .with_compaction(&config.compaction)
        .with_skills(skills);
    if let Some(store) = memory {
        agent = agent.with_memory(store);
    }
    Ok(agent)
}
