//! Agent orchestrator
//!
//! Drives the model through a bounded reason/act/observe loop. Each
//! iteration builds a fresh context from the stored history, calls the
//! model, and either runs the requested tools in order or returns the
//! final answer. The last iteration withholds tools to force a text reply.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::compactor::Compactor;
use crate::agent::context::{BuiltContext, ContextBuilder};
use crate::agent::loop_state::{IterationPhase, LoopState};
use crate::agent::sub_agent::{with_parent, ParentContext};
use crate::core::config::CompactionConfig;
use crate::core::{AgentConfig, Message, Result, Role, ToolDefinition};
use crate::llm::{GenerateOptions, LLMProvider, SanitizerRegistry};
use crate::memory::MemoryStore;
use crate::skills::SkillMeta;
use crate::tools::ToolRegistry;

const CLOSING_NUDGE: &str = "You are close to the limit of reasoning steps. Tool use will be \
withheld on the next step, so gather only what you still need and prepare your final answer.";

const HARD_STOP: &str = "You have reached the maximum number of reasoning steps and tools are \
no longer available. Reply now with your best final answer in plain text, without any tool-call \
markup.";

/// Response used when a run ends without any assistant text
pub const MAX_STEPS_RESPONSE: &str = "I reached the maximum number of reasoning steps before \
finishing this task. Try a narrower request or a higher iteration limit.";

/// Outcome of one `Agent::run`
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Final answer text
    pub response: String,
    /// Snapshot of the full conversation history after the run
    pub messages: Vec<Message>,
    /// Number of model calls made
    pub iterations: usize,
    /// Sum of the per-iteration context token estimates
    pub total_tokens: usize,
}

/// An agent: one conversation history driven by one model
pub struct Agent {
    config: AgentConfig,
    llm: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    context: ContextBuilder,
    sanitizers: Arc<SanitizerRegistry>,
    compaction: Option<CompactionConfig>,
    history: Vec<Message>,
    depth: usize,
}

impl Agent {
    /// Create an agent sharing the given provider and tool registry
    pub fn new(config: AgentConfig, llm: Arc<dyn LLMProvider>, registry: Arc<ToolRegistry>) -> Self {
        let context = ContextBuilder::new(&config, registry.clone());
        Self {
            config,
            llm,
            registry,
            context,
            sanitizers: Arc::new(SanitizerRegistry::default()),
            compaction: None,
            history: Vec::new(),
            depth: 0,
        }
    }

    /// Set the token ceiling for one model call
    pub fn with_max_context_tokens(mut self, max: usize) -> Self {
        self.context = self.context.with_max_context_tokens(max);
        self
    }

    /// Enable LLM compaction of old history
    pub fn with_compaction(mut self, config: &CompactionConfig) -> Self {
        if config.enabled {
            let compactor = Compactor::from_config(self.llm.clone(), self.config.model.clone(), config);
            self.context = self.context.with_compactor(compactor);
            self.compaction = Some(config.clone());
        }
        self
    }

    /// Inject long-term memory into every system prompt
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.context = self.context.with_memory(memory);
        self
    }

    /// Advertise skills in the system prompt
    pub fn with_skills(mut self, skills: Vec<SkillMeta>) -> Self {
        self.context = self.context.with_skills(skills);
        self
    }

    /// Replace the leaked-markup sanitizers
    pub fn with_sanitizers(mut self, sanitizers: Arc<SanitizerRegistry>) -> Self {
        self.sanitizers = sanitizers;
        self
    }

    pub(crate) fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Nesting depth, 0 for a top-level agent
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn context(&self) -> &ContextBuilder {
        &self.context
    }

    /// Mutable access for adding prompt sections or swapping skills
    pub fn context_mut(&mut self) -> &mut ContextBuilder {
        &mut self.context
    }

    /// Read-only view of the conversation history
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Clear the conversation history
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Run the reasoning loop for one user message.
    ///
    /// Provider errors propagate. Tool failures never do: they reach the
    /// model as tool-result text.
    pub async fn run(&mut self, user_message: impl Into<String>) -> Result<RunResult> {
        self.history.push(Message::user(user_message));

        let mut state = LoopState::new(self.config.max_iterations);
        let children = Arc::new(AtomicUsize::new(0));

        info!(
            agent = %self.config.name,
            depth = self.depth,
            max_iterations = state.max_iterations,
            "starting run"
        );

        while state.should_continue() {
            let iteration = state.begin_iteration();
            let phase = state.phase();

            let BuiltContext {
                system_prompt,
                messages,
                tools,
                token_estimate,
                updated_history,
            } = self.context.build(&self.history).await;

            if let Some(compacted) = updated_history {
                info!(
                    before = self.history.len(),
                    after = compacted.len(),
                    "replacing history with compacted history"
                );
                self.history = compacted;
            }
            state.add_tokens(token_estimate);

            let mut request = Vec::with_capacity(messages.len() + 3);
            request.push(Message::system(system_prompt));
            request.extend(messages);
            if phase != IterationPhase::Normal {
                request.push(Message::system(CLOSING_NUDGE));
            }
            let forced = phase == IterationPhase::Forced;
            if forced {
                request.push(Message::system(HARD_STOP));
            }

            let offered: &[ToolDefinition] = if forced { &[] } else { &tools };
            debug!(
                iteration,
                tokens = token_estimate,
                tools = offered.len(),
                forced,
                "calling model"
            );

            let options = GenerateOptions {
                max_tokens: self.config.max_tokens,
                ..Default::default()
            };
            let response = self
                .llm
                .chat(&self.config.model, &request, offered, Some(options))
                .await?;

            if !forced && !response.tool_calls.is_empty() {
                state.begin_tools();
                self.history.push(Message::assistant_with_tools(
                    response.content_str(),
                    response.tool_calls.clone(),
                    response.reasoning_content.clone(),
                ));

                for call in &response.tool_calls {
                    debug!(iteration, tool = %call.name, "executing tool call");
                    let parent = self.parent_context(children.clone());
                    let output = with_parent(parent, self.registry.execute_call(call)).await;
                    self.history.push(Message::tool(call, output));
                }
                continue;
            }

            if forced && !response.tool_calls.is_empty() {
                warn!(iteration, "model requested tools after they were withheld");
            }

            let answer = if forced {
                let cleaned = self
                    .sanitizers
                    .sanitize(self.llm.name(), response.content_str());
                if cleaned.is_empty() {
                    debug!(iteration, "forced answer had no usable text");
                    break;
                }
                cleaned
            } else {
                response.content_str().to_string()
            };

            self.history.push(Message::assistant(answer.clone()));
            state.finish();
            info!(
                iterations = state.iteration,
                total_tokens = state.total_tokens,
                "run complete"
            );
            return Ok(self.result(answer, &state));
        }

        let answer = self
            .history
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.trim().is_empty())
            .map(|m| m.content.clone())
            .unwrap_or_else(|| MAX_STEPS_RESPONSE.to_string());
        warn!(
            iterations = state.iteration,
            "run ended without a final answer, using fallback"
        );
        self.history.push(Message::assistant(answer.clone()));
        state.finish();
        Ok(self.result(answer, &state))
    }

    fn result(&self, response: String, state: &LoopState) -> RunResult {
        RunResult {
            response,
            messages: self.history.clone(),
            iterations: state.iteration,
            total_tokens: state.total_tokens,
        }
    }

    fn parent_context(&self, children: Arc<AtomicUsize>) -> ParentContext {
        ParentContext {
            config: self.config.clone(),
            llm: self.llm.clone(),
            registry: self.registry.clone(),
            sanitizers: self.sanitizers.clone(),
            max_context_tokens: self.context.max_context_tokens(),
            compaction: self.compaction.clone(),
            skills: self.context.skills().to_vec(),
            depth: self.depth,
            children,
        }
    }
}
