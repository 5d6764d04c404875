//! Per-turn context assembly
//!
//! Selects tools, composes the system prompt, then fits the conversation
//! history into the remaining token budget: first by LLM compaction when
//! it triggers, then by mechanical tail-pruning.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::agent::compactor::Compactor;
use crate::agent::prompt::{build_system_prompt, PromptInput, PromptSection};
use crate::agent::tokens::{estimate_message_tokens, estimate_messages_tokens, estimate_tokens};
use crate::core::{AgentConfig, Message, Role, ToolDefinition};
use crate::memory::MemoryStore;
use crate::skills::SkillMeta;
use crate::tools::ToolRegistry;

/// Default token ceiling for one model call
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 32_000;

/// Title of the prompt section holding long-term memory
pub const MEMORY_SECTION_TITLE: &str = "Long-Term Memory";

/// Name tag of the synthetic pruning notice
pub const PRUNE_NOTICE_NAME: &str = "context_pruned";

const PRUNE_NOTICE_PREFIX: &str = "[Context pruned: ";

/// Output of one context build
#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub system_prompt: String,
    /// History to send after the system prompt, possibly pruned
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    /// Estimated tokens of the system prompt plus all messages
    pub token_estimate: usize,
    /// Compacted history the caller should store in place of its own
    pub updated_history: Option<Vec<Message>>,
}

/// Builds the model input for each turn of an agent
pub struct ContextBuilder {
    agent_name: String,
    model: String,
    instructions: String,
    workspace: Option<PathBuf>,
    allowed_tools: Vec<String>,
    registry: Arc<ToolRegistry>,
    max_context_tokens: usize,
    compactor: Option<Compactor>,
    memory: Option<Arc<dyn MemoryStore>>,
    skills: Vec<SkillMeta>,
    sections: Vec<PromptSection>,
}

impl ContextBuilder {
    /// Create a builder for the given agent settings
    pub fn new(config: &AgentConfig, registry: Arc<ToolRegistry>) -> Self {
        Self {
            agent_name: config.name.clone(),
            model: config.model.clone(),
            instructions: config.instructions.clone(),
            workspace: config.workspace.clone(),
            allowed_tools: config.allowed_tools.clone(),
            registry,
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            compactor: None,
            memory: None,
            skills: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn with_max_context_tokens(mut self, max: usize) -> Self {
        self.max_context_tokens = max;
        self
    }

    pub fn with_compactor(mut self, compactor: Compactor) -> Self {
        self.compactor = Some(compactor);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_skills(mut self, skills: Vec<SkillMeta>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_sections(mut self, sections: Vec<PromptSection>) -> Self {
        self.sections = sections;
        self
    }

    /// Append an extra prompt section
    pub fn add_section(&mut self, section: PromptSection) {
        self.sections.push(section);
    }

    /// Replace all extra prompt sections
    pub fn set_sections(&mut self, sections: Vec<PromptSection>) {
        self.sections = sections;
    }

    /// Replace the active skill list
    pub fn set_skills(&mut self, skills: Vec<SkillMeta>) {
        self.skills = skills;
    }

    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn skills(&self) -> &[SkillMeta] {
        &self.skills
    }

    pub fn memory(&self) -> Option<&Arc<dyn MemoryStore>> {
        self.memory.as_ref()
    }

    pub fn max_context_tokens(&self) -> usize {
        self.max_context_tokens
    }

    /// Tool definitions this builder offers to the model
    pub fn selected_tools(&self) -> Vec<ToolDefinition> {
        self.registry.filtered_definitions(&self.allowed_tools)
    }

    /// Build the context for `history` using the current time
    pub async fn build(&self, history: &[Message]) -> BuiltContext {
        self.build_at(history, Utc::now()).await
    }

    /// Build the context for `history` with an explicit timestamp
    pub async fn build_at(&self, history: &[Message], now: DateTime<Utc>) -> BuiltContext {
        let tools = self.selected_tools();

        let mut sections = self.sections.clone();
        if let Some(memory) = &self.memory {
            match memory.read().await {
                Ok(content) if !content.trim().is_empty() => {
                    sections.push(PromptSection::new(MEMORY_SECTION_TITLE, content));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to read long-term memory"),
            }
        }

        let system_prompt = build_system_prompt(&PromptInput {
            instructions: &self.instructions,
            agent_name: &self.agent_name,
            model: &self.model,
            workspace: self.workspace.as_deref(),
            now,
            tools: &tools,
            skills: &self.skills,
            sections: &sections,
        });

        let system_tokens = estimate_tokens(&system_prompt);
        let budget = self.max_context_tokens.saturating_sub(system_tokens);

        let mut updated_history = None;
        if let Some(compactor) = &self.compactor {
            if compactor.should_compact(history, budget) {
                match compactor.compact(history).await {
                    Ok(Some(result)) => updated_history = Some(result.messages),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "history compaction failed, falling back to pruning"),
                }
            }
        }

        let working = updated_history.as_deref().unwrap_or(history);
        let messages = drop_unmatched_tool_results(prune_messages(working, budget));
        let token_estimate = system_tokens + estimate_messages_tokens(&messages);

        debug!(
            system_tokens,
            budget,
            messages = messages.len(),
            token_estimate,
            "built context"
        );

        BuiltContext {
            system_prompt,
            messages,
            tools,
            token_estimate,
            updated_history,
        }
    }
}

/// Keep the longest suffix of `messages` that fits `budget`.
///
/// The most recent message is always kept. When anything is dropped, a
/// system notice with the number of dropped messages is put first; a notice
/// from an earlier prune is folded into the new one. A kept suffix never
/// starts with a tool result whose call was dropped. Applying this to its
/// own output changes nothing.
pub fn prune_messages(messages: &[Message], budget: usize) -> Vec<Message> {
    if estimate_messages_tokens(messages) <= budget {
        return messages.to_vec();
    }

    let carried: usize = messages.iter().filter_map(pruned_count).sum();
    let reserve = estimate_message_tokens(&pruning_notice(messages.len() + carried));
    let effective = budget.saturating_sub(reserve);

    let mut start = messages.len();
    let mut running = 0usize;
    for (idx, message) in messages.iter().enumerate().rev() {
        let cost = estimate_message_tokens(message);
        if start < messages.len() && running + cost > effective {
            break;
        }
        running += cost;
        start = idx;
    }

    while start + 1 < messages.len() && messages[start].role == Role::Tool {
        start += 1;
    }

    if start == 0 {
        return messages.to_vec();
    }

    let dropped = &messages[..start];
    let count: usize = dropped
        .iter()
        .map(|m| pruned_count(m).unwrap_or(1))
        .sum();

    debug!(dropped = count, kept = messages.len() - start, "pruned history");

    let mut result = Vec::with_capacity(messages.len() - start + 1);
    result.push(pruning_notice(count));
    result.extend_from_slice(&messages[start..]);
    result
}

/// Remove tool results whose originating call is not in `messages`.
///
/// A compaction split can summarise an assistant call while its results
/// stay in the kept tail; providers reject such results.
fn drop_unmatched_tool_results(messages: Vec<Message>) -> Vec<Message> {
    let mut calls = HashSet::new();
    let mut kept = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == Role::Tool {
            let matched = message
                .tool_call_id
                .as_ref()
                .is_some_and(|id| calls.contains(id));
            if !matched {
                debug!(tool_call_id = ?message.tool_call_id, "dropping unmatched tool result");
                continue;
            }
        }
        calls.extend(message.tool_calls.iter().map(|c| c.id.clone()));
        kept.push(message);
    }
    kept
}

fn pruning_notice(count: usize) -> Message {
    Message::system(format!(
        "{}{} earlier messages omitted to fit the context window]",
        PRUNE_NOTICE_PREFIX, count
    ))
    .named(PRUNE_NOTICE_NAME)
}

/// Count recorded in a pruning notice, `None` for any other message
fn pruned_count(message: &Message) -> Option<usize> {
    if message.role != Role::System || message.name.as_deref() != Some(PRUNE_NOTICE_NAME) {
        return None;
    }
    message
        .content
        .strip_prefix(PRUNE_NOTICE_PREFIX)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolCall;
    use crate::memory::InMemoryStore;

    fn msg(text_len: usize) -> Message {
        Message::user("x".repeat(text_len))
    }

    #[test]
    fn test_in_budget_is_untouched() {
        let messages = vec![msg(40), msg(40)];
        assert_eq!(prune_messages(&messages, 100), messages);
    }

    #[test]
    fn test_prunes_oldest_and_adds_notice() {
        // each message is 100 tokens
        let messages: Vec<Message> = (0..10).map(|_| msg(400)).collect();
        let pruned = prune_messages(&messages, 350);

        assert_eq!(pruned[0].role, Role::System);
        assert_eq!(pruned[0].name.as_deref(), Some(PRUNE_NOTICE_NAME));
        let kept = pruned.len() - 1;
        assert_eq!(pruned_count(&pruned[0]), Some(10 - kept));
        assert!(estimate_messages_tokens(&pruned) <= 350);
        assert_eq!(pruned.last(), messages.last());
    }

    #[test]
    fn test_oversized_last_message_is_kept() {
        let messages = vec![msg(40), msg(4000)];
        let pruned = prune_messages(&messages, 10);
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned_count(&pruned[0]), Some(1));
        assert_eq!(pruned[1], messages[1]);
    }

    #[test]
    fn test_single_oversized_message_has_no_notice() {
        let messages = vec![msg(4000)];
        assert_eq!(prune_messages(&messages, 10), messages);
    }

    #[test]
    fn test_pruning_is_idempotent() {
        let messages: Vec<Message> = (0..12).map(|i| msg(100 + i * 37)).collect();
        for budget in [0, 5, 50, 120, 300, 700, 5000] {
            let once = prune_messages(&messages, budget);
            let twice = prune_messages(&once, budget);
            assert_eq!(once, twice, "budget {}", budget);
        }
    }

    #[test]
    fn test_orphan_tool_result_is_dropped() {
        let call = ToolCall::new("c1", "exec", "{}");
        let messages = vec![
            Message::user("x".repeat(400)),
            Message::assistant_with_tools("x".repeat(400), vec![call.clone()], None),
            Message::tool(&call, "y".repeat(40)),
            Message::assistant("done"),
        ];
        let pruned = prune_messages(&messages, 60);
        assert_eq!(pruned_count(&pruned[0]), Some(3));
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned[1].content, "done");
    }

    #[tokio::test]
    async fn test_tool_results_after_summary_are_not_sent() {
        let summarised = ToolCall::new("c1", "exec", "{}");
        let kept = ToolCall::new("c2", "exec", "{}");
        let history = vec![
            Message::system("[Context Summary]\nran a command").named("context_summary"),
            Message::tool(&summarised, "exit code: 0"),
            Message::assistant("ran it"),
            Message::user("again"),
            Message::assistant_with_tools("", vec![kept.clone()], None),
            Message::tool(&kept, "exit code: 1"),
        ];
        let ctx = builder(ToolRegistry::new()).build(&history).await;

        assert_eq!(ctx.messages.len(), 5);
        assert_eq!(ctx.messages[1].content, "ran it");
        let results: Vec<_> = ctx.messages.iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("c2"));
    }

    fn builder(registry: ToolRegistry) -> ContextBuilder {
        let config = AgentConfig::new("main", "test-model").with_instructions("Be brief.");
        ContextBuilder::new(&config, Arc::new(registry))
    }

    #[tokio::test]
    async fn test_memory_becomes_a_section() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::with_content("likes tea"));
        let ctx = builder(ToolRegistry::new())
            .with_memory(store)
            .build(&[Message::user("hi")])
            .await;
        assert!(ctx.system_prompt.contains("## Long-Term Memory\n\nlikes tea"));
    }

    #[tokio::test]
    async fn test_empty_memory_adds_nothing() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let ctx = builder(ToolRegistry::new())
            .with_memory(store)
            .build(&[Message::user("hi")])
            .await;
        assert!(!ctx.system_prompt.contains(MEMORY_SECTION_TITLE));
    }

    #[tokio::test]
    async fn test_token_estimate_sums_prompt_and_messages() {
        let history = vec![Message::user("hello there"), Message::assistant("hi")];
        let ctx = builder(ToolRegistry::new()).build(&history).await;
        assert_eq!(
            ctx.token_estimate,
            estimate_tokens(&ctx.system_prompt) + estimate_messages_tokens(&history)
        );
        assert!(ctx.tools.is_empty());
        assert!(ctx.updated_history.is_none());
    }

    #[tokio::test]
    async fn test_sections_are_mutable() {
        let mut b = builder(ToolRegistry::new());
        b.add_section(PromptSection::new("Notes", "first"));
        b.add_section(PromptSection::new("Plan", "second"));
        assert_eq!(b.sections().len(), 2);
        b.set_sections(vec![PromptSection::new("Only", "one")]);
        let ctx = b.build(&[]).await;
        assert!(ctx.system_prompt.contains("## Only\n\none"));
        assert!(!ctx.system_prompt.contains("## Notes"));
    }

    #[tokio::test]
    async fn test_small_window_prunes_history() {
        let history: Vec<Message> = (0..20).map(|_| msg(400)).collect();
        let b = builder(ToolRegistry::new());
        let prompt_tokens = b.build(&[]).await.token_estimate;
        let ctx = b.with_max_context_tokens(prompt_tokens + 450).build(&history).await;
        assert!(ctx.messages.len() < history.len());
        assert_eq!(ctx.messages[0].name.as_deref(), Some(PRUNE_NOTICE_NAME));
    }
}
