//! Sub-agent delegation through `sessions_spawn`

mod common;

use std::sync::Arc;

use common::{call, text, ScriptedProvider};
use cortex::agent::{register_spawn_tool, DelegationLimits, SPAWN_TOOL_NAME};
use cortex::core::{AgentConfig, Role, ToolDefinition};
use cortex::tools::{Tool, ToolRegistry};
use cortex::Agent;

fn registry(limits: DelegationLimits) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register(Tool::new(
            ToolDefinition::function("lookup", "Look something up", serde_json::json!({"type": "object"})),
            |_| async { Ok("42".to_string()) },
        ))
        .unwrap();
    register_spawn_tool(&mut registry, limits).unwrap();
    Arc::new(registry)
}

fn parent_config() -> AgentConfig {
    AgentConfig::new("main", "m")
        .with_instructions("You coordinate work.")
        .with_max_iterations(5)
}

fn tool_results(messages: &[cortex::core::Message]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.content.clone())
        .collect()
}

#[tokio::test]
async fn test_child_result_becomes_tool_result() {
    let llm = ScriptedProvider::new(vec![
        call(
            "s1",
            SPAWN_TOOL_NAME,
            serde_json::json!({
                "task": "Find the answer",
                "name": "researcher",
                "instructions": "Be terse.",
                "allowed_tools": ["lookup"]
            }),
        ),
        text("The answer is 42."),
        text("My researcher says 42."),
    ]);
    let mut agent = Agent::new(parent_config(), llm.clone(), registry(DelegationLimits::default()));

    let result = agent.run("What is the answer? (secret parent context)").await.unwrap();

    assert_eq!(result.response, "My researcher says 42.");
    assert_eq!(tool_results(agent.history()), vec!["The answer is 42."]);

    let calls = llm.calls();
    assert_eq!(calls.len(), 3);

    // the child starts from an empty history
    let child = &calls[1];
    assert_eq!(child.messages.len(), 2);
    assert_eq!(child.messages[1].role, Role::User);
    assert_eq!(child.messages[1].content, "Find the answer");
    assert!(child
        .messages
        .iter()
        .all(|m| !m.content.contains("secret parent context")));

    let child_prompt = &child.messages[0].content;
    assert!(child_prompt.contains("You coordinate work.\n\nBe terse."));
    assert!(child_prompt.contains("- Agent: researcher"));
    assert_eq!(child.tools, vec!["lookup"]);
}

#[tokio::test]
async fn test_default_child_name() {
    let llm = ScriptedProvider::new(vec![
        call("s1", SPAWN_TOOL_NAME, serde_json::json!({"task": "sub work"})),
        text("sub done"),
        text("all done"),
    ]);
    let mut agent = Agent::new(parent_config(), llm.clone(), registry(DelegationLimits::default()));
    agent.run("delegate").await.unwrap();

    let child_prompt = &llm.calls()[1].messages[0].content;
    assert!(child_prompt.contains("- Agent: main-sub-1"));
    assert_eq!(llm.calls()[1].tools, vec!["lookup", SPAWN_TOOL_NAME]);
}

#[tokio::test]
async fn test_depth_limit() {
    let limits = DelegationLimits {
        max_depth: Some(1),
        max_children: None,
    };
    let llm = ScriptedProvider::new(vec![
        // parent spawns a child
        call("s1", SPAWN_TOOL_NAME, serde_json::json!({"task": "level one"})),
        // child tries to spawn a grandchild
        call("s2", SPAWN_TOOL_NAME, serde_json::json!({"task": "level two"})),
        // child answers
        text("child gave up on delegating"),
        // parent answers
        text("final"),
    ]);
    let mut agent = Agent::new(parent_config(), llm.clone(), registry(limits));

    let result = agent.run("go deep").await.unwrap();
    assert_eq!(result.response, "final");
    assert_eq!(tool_results(agent.history()), vec!["child gave up on delegating"]);

    let calls = llm.calls();
    assert_eq!(calls.len(), 4);
    let child_results = tool_results(&calls[2].messages);
    assert_eq!(child_results.len(), 1);
    assert!(child_results[0].starts_with("Error:"));
    assert!(child_results[0].contains("nesting limit"));
}

#[tokio::test]
async fn test_children_limit() {
    let limits = DelegationLimits {
        max_depth: None,
        max_children: Some(1),
    };
    let two_spawns = cortex::llm::LLMResponse::with_tool_calls(vec![
        cortex::core::ToolCall::new("s1", SPAWN_TOOL_NAME, r#"{"task":"first"}"#),
        cortex::core::ToolCall::new("s2", SPAWN_TOOL_NAME, r#"{"task":"second"}"#),
    ]);
    let llm = ScriptedProvider::new(vec![two_spawns, text("first child done"), text("final")]);
    let mut agent = Agent::new(parent_config(), llm.clone(), registry(limits));

    agent.run("fan out").await.unwrap();

    let results = tool_results(agent.history());
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], "first child done");
    assert!(results[1].starts_with("Error:"));
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_child_provider_error_is_caught() {
    // the script runs dry inside the child, which surfaces as a provider error there
    let llm = ScriptedProvider::new(vec![call(
        "s1",
        SPAWN_TOOL_NAME,
        serde_json::json!({"task": "doomed"}),
    )]);
    let mut agent = Agent::new(parent_config(), llm.clone(), registry(DelegationLimits::default()));

    let err = agent.run("try it").await.unwrap_err();
    // the parent's own next call fails too, but the child's failure was recorded first
    assert!(err.is_provider_error());
    let results = tool_results(agent.history());
    assert_eq!(results.len(), 1);
    assert!(results[0].starts_with("Error: sub-agent main-sub-1 failed"));
}

#[tokio::test]
async fn test_missing_task_is_error_text() {
    let llm = ScriptedProvider::new(vec![
        call("s1", SPAWN_TOOL_NAME, serde_json::json!({"name": "nobody"})),
        text("ok"),
    ]);
    let mut agent = Agent::new(parent_config(), llm.clone(), registry(DelegationLimits::default()));
    agent.run("spawn without task").await.unwrap();

    let results = tool_results(agent.history());
    assert!(results[0].starts_with("Error: invalid arguments"));
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_child_cannot_widen_parent_allowlist() {
    let llm = ScriptedProvider::new(vec![
        call(
            "s1",
            SPAWN_TOOL_NAME,
            serde_json::json!({"task": "run things", "allowed_tools": ["exec"]}),
        ),
        text("child done"),
        text("parent done"),
    ]);
    let config = parent_config().with_allowed_tools(vec![SPAWN_TOOL_NAME.to_string()]);
    let mut agent = Agent::new(config, llm.clone(), registry(DelegationLimits::default()));
    agent.run("delegate narrowly").await.unwrap();

    let calls = llm.calls();
    assert_eq!(calls[0].tools, vec![SPAWN_TOOL_NAME]);
    assert_eq!(calls[1].tools, vec![SPAWN_TOOL_NAME]);
}
