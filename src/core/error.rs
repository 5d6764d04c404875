//! Custom error types for Cortex
//!
//! Provides a unified error handling system across all modules.
//! Recoverable tool failures never show up here: they are encoded as
//! result text and fed back to the model.

use thiserror::Error;

/// Main error type for Cortex operations
#[derive(Error, Debug)]
pub enum CortexError {
    /// LLM transport, authentication or rate-limit errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Model not available on the configured provider
    #[error("Model '{0}' is not available on the configured provider")]
    ModelNotFound(String),

    /// A tool with the same name is already registered
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// Tool execution errors raised outside a handler
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Skill metadata errors
    #[error("Skill error: {0}")]
    Skill(String),

    /// Long-term memory store errors
    #[error("Memory error: {0}")]
    Memory(String),

    /// Sub-agent delegation errors
    #[error("Delegation error: {0}")]
    Delegation(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Cortex operations
pub type Result<T> = std::result::Result<T, CortexError>;

impl CortexError {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a skill error
    pub fn skill(msg: impl Into<String>) -> Self {
        Self::Skill(msg.into())
    }

    /// Create a memory error
    pub fn memory(msg: impl Into<String>) -> Self {
        Self::Memory(msg.into())
    }

    /// Create a delegation error
    pub fn delegation(msg: impl Into<String>) -> Self {
        Self::Delegation(msg.into())
    }

    /// Whether this error came from the LLM transport layer
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::ModelNotFound(_) | Self::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_tool_message() {
        let err = CortexError::DuplicateTool("exec".into());
        assert_eq!(err.to_string(), "Tool 'exec' is already registered");
    }

    #[test]
    fn test_provider_classification() {
        assert!(CortexError::provider("rate limited").is_provider_error());
        assert!(!CortexError::config("bad").is_provider_error());
    }
}
