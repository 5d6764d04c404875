//! Full assembly from `Config`: built-in tools, skills and long-term memory

mod common;

use std::fs;

use common::{call, text, ScriptedProvider};
use cortex::core::Role;
use cortex::{build_agent, Config};

const SKILL: &str = r#"---
name: git-helper
description: Commit message conventions
tags: [git, vcs]
version: "1.0"
---
# Git helper

Always write commit subjects in the imperative mood. (skill body marker)
"#;

fn workspace_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.agent.workspace = Some(dir.to_path_buf());
    config.agent.max_iterations = 5;
    config.memory.enabled = true;
    config.memory.path = None;
    config.skills.enabled = true;
    config.delegation.enabled = true;
    config.compaction.enabled = false;
    config
}

#[tokio::test]
async fn test_memory_skills_and_builtin_tools() {
    let dir = tempfile::tempdir().unwrap();
    let skill_dir = dir.path().join(".cortex/skills/git-helper");
    fs::create_dir_all(&skill_dir).unwrap();
    fs::write(skill_dir.join("SKILL.md"), SKILL).unwrap();

    let llm = ScriptedProvider::new(vec![
        call("m1", "update_memory", serde_json::json!({"content": "User prefers tea."})),
        text("Saved."),
        call(
            "r1",
            "read_file",
            serde_json::json!({"path": ".cortex/skills/git-helper/SKILL.md"}),
        ),
        text("Use the imperative mood."),
    ]);

    let config = workspace_config(dir.path());
    let mut agent = build_agent(&config, llm.clone()).unwrap();

    // first run writes memory through the tool
    let result = agent.run("Remember that I prefer tea.").await.unwrap();
    assert_eq!(result.response, "Saved.");
    let memory_file = dir.path().join(".cortex/MEMORY.md");
    assert_eq!(fs::read_to_string(&memory_file).unwrap(), "User prefers tea.");

    let calls = llm.calls();
    assert_eq!(
        calls[0].tools,
        vec!["read_file", "exec", "search_text", "update_memory", "sessions_spawn"]
    );

    // the skill is advertised by header only
    let first_prompt = &calls[0].messages[0].content;
    assert!(first_prompt.contains("**git-helper** (v1.0): Commit message conventions [tags: git, vcs]"));
    assert!(!first_prompt.contains("skill body marker"));
    assert!(!first_prompt.contains("Long-Term Memory"));

    // second run sees the memory and reads the skill body on demand
    let result = agent.run("How should I write commits?").await.unwrap();
    assert_eq!(result.response, "Use the imperative mood.");

    let calls = llm.calls();
    let second_prompt = &calls[2].messages[0].content;
    assert!(second_prompt.contains("## Long-Term Memory\n\nUser prefers tea."));

    let skill_result = agent
        .history()
        .iter()
        .rev()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(skill_result.content.contains("skill body marker"));
}

#[tokio::test]
async fn test_disabled_features_are_not_wired() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = workspace_config(dir.path());
    config.memory.enabled = false;
    config.delegation.enabled = false;
    config.skills.enabled = false;

    let llm = ScriptedProvider::new(vec![text("hi")]);
    let mut agent = build_agent(&config, llm.clone()).unwrap();
    agent.run("hello").await.unwrap();

    assert_eq!(llm.calls()[0].tools, vec!["read_file", "exec", "search_text"]);
    assert!(agent.context().memory().is_none());
    assert!(agent.context().skills().is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = workspace_config(dir.path());
    config.agent.max_iterations = 0;

    let llm = ScriptedProvider::new(vec![]);
    assert!(build_agent(&config, llm).is_err());
}
