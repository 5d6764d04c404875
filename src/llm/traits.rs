//! LLM Provider trait for abstracting different backends
//!
//! Enables swapping between Ollama, OpenAI-compatible endpoints and
//! scripted providers in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{Message, Result, ToolCall, ToolDefinition};

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
}

impl FinishReason {
    /// Map a provider's finish/done reason string
    pub fn from_provider(reason: Option<&str>, has_tool_calls: bool) -> Self {
        match reason {
            Some("length") | Some("max_tokens") => Self::Length,
            Some("content_filter") => Self::ContentFilter,
            Some("tool_calls") | Some("function_call") => Self::ToolCalls,
            _ if has_tool_calls => Self::ToolCalls,
            _ => Self::Stop,
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Text content of the response, if any
    pub content: Option<String>,
    /// Any tool calls the model wants to make
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Reasoning trace some providers require echoed back
    pub reasoning_content: Option<String>,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

impl LLMResponse {
    /// A plain text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            reasoning_content: None,
            usage: None,
            model: String::new(),
        }
    }

    /// A response requesting tool calls
    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
            finish_reason: FinishReason::ToolCalls,
            reasoning_content: None,
            usage: None,
            model: String::new(),
        }
    }

    /// Text content, empty when absent
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Options for LLM generation
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

/// Trait for LLM providers
///
/// `chat` must accept an empty tool slice (forced-answer mode) and must send
/// `reasoning_content` of assistant messages back to providers that need it.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a response from messages, offering the given tools
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Check if a model is available
    async fn is_model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.is_empty() || models.iter().any(|m| m == model))
    }

    /// Get the provider name, used to select response post-processing
    fn name(&self) -> &str;
}
