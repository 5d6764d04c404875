//! Cortex - a bounded ReAct agent runtime
//!
//! Drives a language model through a reason/act/observe loop, fitting the
//! conversation into a token budget on every turn, delegating sub-tasks to
//! nested agents and keeping a long-term memory per workspace.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction with Ollama and OpenAI-compatible adapters
//! - **Tools**: Tool registry and built-in tools
//! - **Agent**: Context assembly, compaction, the agent loop and delegation
//! - **Skills / Memory**: Skill metadata discovery and the memory store
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use cortex::{build_agent, llm::create_provider, Config};
//!
//! #[tokio::main]
//! async fn main() -> cortex::Result<()> {
//!     let config = Config::load();
//!     let llm = create_provider(&config)?;
//!     let mut agent = build_agent(&config, llm)?;
//!
//!     let result = agent.run("List the files in this project").await?;
//!     println!("{}", result.response);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod memory;
pub mod skills;
pub mod tools;

// Re-export commonly used items
pub use agent::{build_agent, Agent, RunResult};
pub use cli::Repl;
pub use crate::core::{AgentConfig, Config, CortexError, Result};
