//! Cortex - bounded ReAct agent runtime
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;

use clap::Parser;
use cortex::core::config::ProviderType;
use cortex::llm::create_provider;
use cortex::{build_agent, Config, Repl};
use tracing_subscriber::EnvFilter;

/// Cortex - bounded ReAct agent runtime
#[derive(Parser, Debug)]
#[command(name = "cortex")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model identifier passed to the provider
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Provider backend (ollama, openai)
    #[arg(long)]
    provider: Option<ProviderType>,

    /// Workspace root for file tools, memory and skills
    #[arg(long, short = 'w')]
    workspace: Option<PathBuf>,

    /// Iteration ceiling of the reasoning loop
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "cortex=debug" } else { "cortex=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(model) = args.model {
        config.agent.model = model;
    }
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }
    if let Some(workspace) = args.workspace {
        config.agent.workspace = Some(workspace);
    }
    if let Some(max) = args.max_iterations {
        config.agent.max_iterations = max;
    }
    config.validate()?;

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let llm = create_provider(&config)?;
        let mut agent = build_agent(&config, llm)?;
        let result = agent.run(prompt).await?;
        println!("{}", result.response);
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::with_config(config)?;
    repl.run().await?;

    Ok(())
}
