//! Interactive REPL for Cortex
//!
//! Provides the main user interaction loop.

use std::io::{self, BufRead, Write};

use crate::agent::{build_agent, Agent};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result};
use crate::llm::create_provider;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    agent: Agent,
    config: Config,
}

impl Repl {
    /// Create a REPL with configuration loaded from disk and environment
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load())
    }

    /// Create a REPL with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let llm = create_provider(&config)?;
        let agent = build_agent(&config, llm)?;
        Ok(Self { agent, config })
    }

    /// Create a REPL around an already assembled agent
    pub fn with_agent(agent: Agent, config: Config) -> Self {
        Self { agent, config }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            match handle_command(&input, &mut self.agent, &self.config).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Clear) => {
                    println!("Conversation cleared.\n");
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::None) => {}
                Ok(CommandResult::Continue(input)) => match self.agent.run(input).await {
                    Ok(result) => {
                        println!("\nAssistant:\n{}\n", result.response);
                        println!(
                            "({} iteration(s), ~{} tokens)\n",
                            result.iterations, result.total_tokens
                        );
                    }
                    Err(e) => {
                        eprintln!("\nError: {}\n", e);
                    }
                },
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let agent_config = self.agent.config();

        println!("\nCortex - bounded ReAct agent runtime\n");
        println!("Provider:   {:?} ({})", self.config.llm.provider, self.config.llm.base_url);
        println!("Model:      {}", agent_config.model);
        println!("Workspace:  {}", agent_config.workspace_root().display());
        println!("Tools:      {}", self.agent.registry().names().join(", "));
        println!("Max steps:  {}", agent_config.max_iterations);
        println!();
        println!("Commands: /help, /reset, /history, /tools, /skills, /memory, /config, /exit");
        println!("─────────────────────────────────────────────────────────────");
    }
}
