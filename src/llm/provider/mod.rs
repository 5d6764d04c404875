//! LLM Provider implementations and factory
//!
//! Ollama lives in `llm::ollama`; other backends are submodules here.

pub mod openai;

use std::sync::Arc;

use crate::core::config::{Config, ProviderType};
use crate::core::Result;
use crate::llm::traits::LLMProvider;
use crate::llm::OllamaClient;

use self::openai::OpenAiProvider;

/// Create a new LLM provider based on configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.llm.provider {
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
        ProviderType::OpenAi => Arc::new(OpenAiProvider::from_config(config)?),
    };
    Ok(provider)
}
