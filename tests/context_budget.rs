//! Token budget handling: compaction inside the loop and tail-pruning

mod common;

use std::sync::Arc;

use common::{text, ScriptedProvider};
use cortex::agent::compactor::SUMMARY_PREFIX;
use cortex::agent::context::PRUNE_NOTICE_NAME;
use cortex::agent::{estimate_messages_tokens, is_summary, prune_messages, ContextBuilder};
use cortex::core::config::CompactionConfig;
use cortex::core::{AgentConfig, Message, Role, ToolCall};
use cortex::tools::ToolRegistry;
use cortex::Agent;

fn config() -> AgentConfig {
    AgentConfig::new("budget", "m")
        .with_instructions("Keep it short.")
        .with_max_iterations(4)
}

async fn system_prompt_tokens(config: &AgentConfig) -> usize {
    ContextBuilder::new(config, Arc::new(ToolRegistry::new()))
        .build(&[])
        .await
        .token_estimate
}

#[tokio::test]
async fn test_compaction_replaces_history_during_run() {
    let cfg = config();
    // 150 tokens left for messages after the system prompt
    let max_context = system_prompt_tokens(&cfg).await + 150;
    let compaction = CompactionConfig {
        enabled: true,
        keep_recent: 2,
        trigger_ratio: 0.8,
        summary_max_tokens: 256,
    };

    let llm = ScriptedProvider::new(vec![
        text("a1"),
        text("a2"),
        text("The user asked three long questions."),
        text("a3"),
    ]);
    let mut agent = Agent::new(cfg, llm.clone(), Arc::new(ToolRegistry::new()))
        .with_max_context_tokens(max_context)
        .with_compaction(&compaction);

    let long = |c: char| c.to_string().repeat(400);

    // 100 tokens: under the trigger
    agent.run(long('a')).await.unwrap();
    assert_eq!(agent.history().len(), 2);

    // over the trigger, but 3 messages are too few to compact
    agent.run(long('b')).await.unwrap();
    assert_eq!(agent.history().len(), 4);
    assert_eq!(llm.call_count(), 2);

    // 5 messages: the summary call happens before the answer
    let result = agent.run(long('c')).await.unwrap();
    assert_eq!(result.response, "a3");
    assert_eq!(llm.call_count(), 4);

    let history = agent.history();
    assert_eq!(history.len(), 4);
    assert!(is_summary(&history[0]));
    assert!(history[0].content.starts_with(SUMMARY_PREFIX));
    assert!(history[0].content.contains("three long questions"));
    assert_eq!(history[1].content, "a2");
    assert_eq!(history[2].content, long('c'));
    assert_eq!(history[3].content, "a3");

    let summary_call = &llm.calls()[2];
    assert!(summary_call.tools.is_empty());
    assert_eq!(summary_call.max_tokens, Some(256));
}

#[tokio::test]
async fn test_disabled_compaction_only_prunes() {
    let cfg = config();
    let max_context = system_prompt_tokens(&cfg).await + 150;
    let compaction = CompactionConfig {
        enabled: false,
        keep_recent: 2,
        trigger_ratio: 0.8,
        summary_max_tokens: 256,
    };

    let llm = ScriptedProvider::new(vec![text("a1"), text("a2"), text("a3")]);
    let mut agent = Agent::new(cfg, llm.clone(), Arc::new(ToolRegistry::new()))
        .with_max_context_tokens(max_context)
        .with_compaction(&compaction);

    for c in ['a', 'b', 'c'] {
        agent.run(c.to_string().repeat(400)).await.unwrap();
    }

    assert_eq!(llm.call_count(), 3);
    assert_eq!(agent.history().len(), 6);

    // the last request was pruned, the stored history was not
    let last = &llm.calls()[2].messages;
    assert_eq!(last[1].name.as_deref(), Some(PRUNE_NOTICE_NAME));
    assert_eq!(last.last().unwrap().content, "c".repeat(400));
}

fn mixed_history() -> Vec<Message> {
    let mut messages = Vec::new();
    for i in 0..8 {
        messages.push(Message::user(format!("question {} {}", i, "q".repeat(60 + i * 13))));
        let call = ToolCall::new(format!("call_{}", i), "search_text", r#"{"pattern":"fn main"}"#);
        messages.push(Message::assistant_with_tools("", vec![call.clone()], None));
        messages.push(Message::tool(&call, "r".repeat(90 + i * 7)));
        messages.push(Message::assistant(format!("answer {}", i)));
    }
    messages
}

#[test]
fn test_pruning_is_idempotent_across_budgets() {
    let history = mixed_history();
    for budget in (0..=600).step_by(15) {
        let once = prune_messages(&history, budget);
        let twice = prune_messages(&once, budget);
        assert_eq!(once, twice, "budget {}", budget);

        assert_eq!(once.last(), history.last());
        let has_notice = once[0].name.as_deref() == Some(PRUNE_NOTICE_NAME);
        assert_eq!(has_notice, once != history);
    }
}

#[test]
fn test_pruned_output_never_starts_with_orphan_tool_result() {
    let history = mixed_history();
    for budget in (20..=600).step_by(7) {
        let pruned = prune_messages(&history, budget);
        let first_real = if pruned[0].name.as_deref() == Some(PRUNE_NOTICE_NAME) {
            &pruned[1]
        } else {
            &pruned[0]
        };
        assert_ne!(first_real.role, Role::Tool, "budget {}", budget);
        if pruned.len() > 1 && pruned[0].role == Role::System {
            assert!(estimate_messages_tokens(&pruned) <= budget || pruned.len() == 2);
        }
    }
}
