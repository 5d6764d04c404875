//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction, the Ollama and OpenAI-compatible
//! adapters, and provider-specific response post-processing.

pub mod ollama;
pub mod provider;
pub mod sanitize;
pub mod traits;

pub use ollama::OllamaClient;
pub use provider::create_provider;
pub use sanitize::{ResponseSanitizer, SanitizerRegistry};
pub use traits::{FinishReason, GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
