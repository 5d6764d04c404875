//! System prompt assembly
//!
//! Pure composition of the system prompt from its parts. The only
//! non-deterministic input, the current time, is passed in explicitly.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::core::ToolDefinition;
use crate::skills::SkillMeta;

/// Divider placed between prompt blocks
pub const PROMPT_DIVIDER: &str = "\n\n---\n\n";

/// An extra titled block appended after tools and skills
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSection {
    pub title: String,
    pub body: String,
}

impl PromptSection {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    fn render(&self) -> String {
        format!("## {}\n\n{}", self.title, self.body.trim_end())
    }
}

/// Everything the system prompt is built from
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
    pub instructions: &'a str,
    pub agent_name: &'a str,
    pub model: &'a str,
    pub workspace: Option<&'a Path>,
    pub now: DateTime<Utc>,
    pub tools: &'a [ToolDefinition],
    pub skills: &'a [SkillMeta],
    pub sections: &'a [PromptSection],
}

/// Compose the system prompt.
///
/// Block order is fixed: instructions, runtime, tools, skills, then the
/// extra sections. The tools and skills blocks are left out when empty.
pub fn build_system_prompt(input: &PromptInput<'_>) -> String {
    let mut blocks = Vec::new();

    let instructions = input.instructions.trim();
    if !instructions.is_empty() {
        blocks.push(instructions.to_string());
    }

    blocks.push(runtime_block(input));

    if !input.tools.is_empty() {
        blocks.push(tools_block(input.tools));
    }

    if !input.skills.is_empty() {
        blocks.push(skills_block(input.skills));
    }

    blocks.extend(input.sections.iter().map(PromptSection::render));

    blocks.join(PROMPT_DIVIDER)
}

fn runtime_block(input: &PromptInput<'_>) -> String {
    let mut block = String::from("## Runtime\n\n");
    block.push_str(&format!("- Agent: {}\n", input.agent_name));
    block.push_str(&format!("- Model: {}\n", input.model));
    block.push_str(&format!(
        "- Time: {}",
        input.now.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    if let Some(workspace) = input.workspace {
        block.push_str(&format!("\n- Workspace: {}", workspace.display()));
    }
    block
}

fn tools_block(tools: &[ToolDefinition]) -> String {
    let mut block = String::from("## Available Tools\n");
    for tool in tools {
        block.push_str(&format!(
            "\n- **{}**: {}\n  Parameters: {}",
            tool.function.name, tool.function.description, tool.function.parameters
        ));
    }
    block
}

fn skills_block(skills: &[SkillMeta]) -> String {
    let mut block = String::from(
        "## Skills\n\n\
         Skills hold detailed instructions for specialised tasks. Before using a skill, \
         read its full SKILL.md file with the read_file tool; only the summary is shown here.\n",
    );
    for skill in skills {
        let version = skill
            .version
            .as_deref()
            .map(|v| format!(" (v{})", v))
            .unwrap_or_default();
        let tags = if skill.tags.is_empty() {
            String::new()
        } else {
            format!(" [tags: {}]", skill.tags.join(", "))
        };
        block.push_str(&format!(
            "\n- **{}**{}: {}{}\n  Path: {}",
            skill.name,
            version,
            skill.description,
            tags,
            skill.path.display()
        ));
    }
    block
}
