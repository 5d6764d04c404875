//! Configuration management for Cortex
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/cortex/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{CortexError, Result};

/// Main configuration for Cortex
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Per-agent settings for the root agent
    pub agent: AgentConfig,
    /// Context window configuration
    #[serde(default)]
    pub context: ContextConfig,
    /// History compaction configuration
    #[serde(default)]
    pub compaction: CompactionConfig,
    /// Skill discovery configuration
    #[serde(default)]
    pub skills: SkillsConfig,
    /// Long-term memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Sub-agent delegation configuration
    #[serde(default)]
    pub delegation: DelegationConfig,
}

/// Which LLM backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Local Ollama server
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
}

impl std::str::FromStr for ProviderType {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            other => Err(CortexError::config(format!("Unknown provider: {}", other))),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider backend
    pub provider: ProviderType,
    /// Base URL of the provider API
    pub base_url: String,
    /// API key, if the provider needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Immutable per-agent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name of the agent
    pub name: String,
    /// Base instructions placed first in the system prompt
    pub instructions: String,
    /// Model identifier passed to the provider
    pub model: String,
    /// Maximum tokens per LLM response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool allowlist (empty = all registered tools)
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Iteration ceiling of the reasoning loop
    pub max_iterations: usize,
    /// Workspace root for file tools and memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
}

/// Context window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Estimated token ceiling for one model call
    pub max_context_tokens: usize,
}

/// History compaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Whether LLM-driven compaction is enabled
    pub enabled: bool,
    /// Number of most recent messages kept verbatim
    pub keep_recent: usize,
    /// Fraction of the budget above which compaction triggers
    pub trigger_ratio: f64,
    /// Response token limit for the summary call
    pub summary_max_tokens: u32,
}

/// Skill discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Whether skills are advertised in the system prompt
    pub enabled: bool,
    /// Directories scanned for SKILL.md files
    #[serde(default)]
    pub directories: Vec<PathBuf>,
}

/// Long-term memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Whether the memory blob is read into context and writable by tool
    pub enabled: bool,
    /// Explicit path of the memory file (default: <workspace>/.cortex/MEMORY.md)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Sub-agent delegation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationConfig {
    /// Whether the `sessions_spawn` tool is registered
    pub enabled: bool,
    /// Maximum nesting depth of sub-agents (unset = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Maximum sub-agents one agent may spawn per run (unset = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_children: Option<usize>,
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Default for LlmConfig {
    fn default() -> Self {
        let provider = env_parse("CORTEX_PROVIDER").unwrap_or(ProviderType::Ollama);
        let base_url = env::var("CORTEX_BASE_URL").unwrap_or_else(|_| match provider {
            ProviderType::Ollama => "http://localhost:11434".to_string(),
            ProviderType::OpenAi => "https://api.openai.com/v1".to_string(),
        });

        Self {
            provider,
            base_url,
            api_key: env::var("CORTEX_API_KEY")
                .or_else(|_| env::var("OPENAI_API_KEY"))
                .ok(),
            timeout_secs: env_parse("CORTEX_TIMEOUT_SECS").unwrap_or(120),
            temperature: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "cortex".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            model: env::var("CORTEX_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            max_tokens: None,
            allowed_tools: Vec::new(),
            max_iterations: env_parse("CORTEX_MAX_ITERATIONS").unwrap_or(10),
            workspace: env::var("CORTEX_WORKSPACE").ok().map(PathBuf::from),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: env_parse("CORTEX_MAX_CONTEXT_TOKENS").unwrap_or(32_000),
        }
    }
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("CORTEX_COMPACTION", true),
            keep_recent: 10,
            trigger_ratio: 0.8,
            summary_max_tokens: 1024,
        }
    }
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("CORTEX_SKILLS", true),
            directories: vec![PathBuf::from(".cortex/skills")],
        }
    }
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("CORTEX_DELEGATION", true),
            max_depth: None,
            max_children: None,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("CORTEX_MEMORY", true),
            path: None,
        }
    }
}

/// Instructions used when none are configured
pub const DEFAULT_INSTRUCTIONS: &str = "You are a capable assistant that solves tasks step by step. \
Use the available tools when they help; answer directly when they do not. \
When the task is complete, reply with the final answer only.";

impl AgentConfig {
    /// Create settings for a named agent with otherwise default values
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set base instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set the iteration ceiling
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the tool allowlist
    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = tools;
        self
    }

    /// Set the response token limit
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the workspace root
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Workspace root, defaulting to the current directory
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cortex")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(CortexError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| CortexError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CortexError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(CortexError::config("agent.max_iterations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.compaction.trigger_ratio) {
            return Err(CortexError::config(
                "compaction.trigger_ratio must be between 0 and 1",
            ));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| CortexError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CortexError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(Self::config_file(), content)
            .map_err(|e| CortexError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Per-agent settings for the root agent
    pub fn agent_config(&self) -> AgentConfig {
        self.agent.clone()
    }

    /// Memory file path for the configured workspace
    pub fn memory_path(&self) -> PathBuf {
        self.memory.path.clone().unwrap_or_else(|| {
            self.agent
                .workspace_root()
                .join(".cortex")
                .join("MEMORY.md")
        })
    }

    /// Skill directories resolved against the workspace
    pub fn skill_directories(&self) -> Vec<PathBuf> {
        let root = self.agent.workspace_root();
        self.skills
            .directories
            .iter()
            .map(|dir| if dir.is_absolute() { dir.clone() } else { root.join(dir) })
            .collect()
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        toml::to_string_pretty(&Config::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.compaction.keep_recent, 10);
        assert!((config.compaction.trigger_ratio - 0.8).abs() < f64::EPSILON);
        assert!(config.delegation.max_depth.is_none());
        assert!(config.delegation.max_children.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let toml_str = Config::default_config_toml();
        assert!(toml_str.contains("[agent]"));
        assert!(toml_str.contains("max_iterations"));
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.agent.name, Config::default().agent.name);
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let mut config = Config::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_type_parse() {
        assert_eq!("Ollama".parse::<ProviderType>().unwrap(), ProviderType::Ollama);
        assert_eq!("openai".parse::<ProviderType>().unwrap(), ProviderType::OpenAi);
        assert!("bogus".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_memory_path_defaults_to_workspace() {
        let mut config = Config::default();
        config.agent.workspace = Some(PathBuf::from("/tmp/ws"));
        assert_eq!(config.memory_path(), PathBuf::from("/tmp/ws/.cortex/MEMORY.md"));
    }

    #[test]
    fn test_config_dir() {
        assert!(Config::config_dir().to_string_lossy().contains("cortex"));
    }
}
