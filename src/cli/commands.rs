//! CLI commands
//!
//! Slash commands that can be executed in the REPL.

use crate::agent::Agent;
use crate::core::{Config, Message, Result, Role};
use crate::memory::MemoryStore;

const PREVIEW_CHARS: usize = 120;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Clear history
    Clear,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, agent: &mut Agent, config: &Config) -> Result<CommandResult> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(CommandResult::None);
    }

    if matches!(input, "exit" | "quit") {
        return Ok(CommandResult::Exit);
    }

    let Some(command) = input.strip_prefix('/') else {
        return Ok(CommandResult::Continue(input.to_string()));
    };
    let cmd = command.split_whitespace().next().unwrap_or("").to_lowercase();

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "reset" | "clear" => {
            agent.reset();
            Ok(CommandResult::Clear)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "history" => Ok(CommandResult::Handled(format_history(agent.history()))),

        "tools" => {
            let allowed = &agent.config().allowed_tools;
            let lines: Vec<String> = agent
                .registry()
                .all_definitions()
                .iter()
                .map(|def| {
                    let marker = if allowed.is_empty() || allowed.iter().any(|a| a == def.name()) {
                        "*"
                    } else {
                        " "
                    };
                    format!("{} {:<16} {}", marker, def.name(), def.function.description)
                })
                .collect();
            if lines.is_empty() {
                return Ok(CommandResult::Handled("No tools registered.".to_string()));
            }
            Ok(CommandResult::Handled(format!(
                "Tools (* = offered to the model):\n{}",
                lines.join("\n")
            )))
        }

        "skills" => {
            let skills = agent.context().skills();
            if skills.is_empty() {
                return Ok(CommandResult::Handled("No skills discovered.".to_string()));
            }
            let lines: Vec<String> = skills
                .iter()
                .map(|s| format!("  {:<20} {}\n    {}", s.name, s.description, s.path.display()))
                .collect();
            Ok(CommandResult::Handled(format!("Skills:\n{}", lines.join("\n"))))
        }

        "memory" => match agent.context().memory() {
            None => Ok(CommandResult::Handled("Long-term memory is disabled.".to_string())),
            Some(store) => {
                let content = store.read().await?;
                if content.trim().is_empty() {
                    Ok(CommandResult::Handled("Long-term memory is empty.".to_string()))
                } else {
                    Ok(CommandResult::Handled(format!("Long-term memory:\n{}", content.trim_end())))
                }
            }
        },

        "config" => {
            let rendered = toml::to_string_pretty(config)
                .unwrap_or_else(|e| format!("# Failed to render config: {}", e));
            Ok(CommandResult::Handled(format!(
                "Config file: {}\n\n{}",
                Config::config_file().display(),
                rendered
            )))
        }

        _ => Ok(CommandResult::Handled(format!(
            "Unknown command: /{}. Type /help for available commands.",
            cmd
        ))),
    }
}

fn format_history(history: &[Message]) -> String {
    if history.is_empty() {
        return "History is empty.".to_string();
    }

    let mut out = format!("History ({} messages):", history.len());
    for (i, message) in history.iter().enumerate() {
        let mut line = preview(&message.content);
        if !message.tool_calls.is_empty() {
            let calls: Vec<&str> = message.tool_calls.iter().map(|c| c.name.as_str()).collect();
            line = format!("{} [calls: {}]", line, calls.join(", "));
        }
        let label = match (message.role, message.name.as_deref()) {
            (Role::Tool, Some(name)) | (Role::System, Some(name)) => format!("{}:{}", message.role, name),
            _ => message.role.to_string(),
        };
        out.push_str(&format!("\n{:>3}. {:<24} {}", i + 1, label, line.trim()));
    }
    out
}

fn preview(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    match single_line.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &single_line[..idx]),
        None => single_line,
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Cortex Commands:
─────────────────────────────────────────────
  /help, /?        Show this help message
  /reset           Clear conversation history
  /history         Show the conversation history
  /tools           List registered tools
  /skills          List discovered skills
  /memory          Show the long-term memory
  /config          Show the active configuration
  /exit, exit      Exit Cortex

Keyboard Shortcuts:
  Ctrl+D           Exit Cortex
─────────────────────────────────────────────"#
        .to_string()
}
