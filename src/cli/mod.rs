//! Interactive shell around a single [`Agent`](crate::Agent)
//!
//! `repl` owns the read loop; `commands` handles the `/slash` commands that
//! inspect or reset the agent without calling the model.

pub mod commands;
pub mod repl;

pub use commands::{handle_command, CommandResult};
pub use repl::Repl;
