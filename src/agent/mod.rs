//! Agent module - the reasoning loop and everything it drives
//!
//! Contains context assembly (prompt, token budget, pruning, compaction),
//! the agent loop itself and sub-agent delegation.

pub mod compactor;
pub mod context;
pub mod loop_state;
pub mod orchestrator;
pub mod prompt;
pub mod setup;
pub mod sub_agent;
pub mod tokens;

pub use compactor::{is_summary, CompactionResult, Compactor};
pub use context::{prune_messages, BuiltContext, ContextBuilder};
pub use loop_state::{IterationPhase, LoopState, LoopStatus};
pub use orchestrator::{Agent, RunResult};
pub use prompt::{build_system_prompt, PromptInput, PromptSection};
pub use setup::build_agent;
pub use sub_agent::{register_spawn_tool, spawn_tool, DelegationLimits, SPAWN_TOOL_NAME};
pub use tokens::{estimate_message_tokens, estimate_messages_tokens, estimate_tokens};
