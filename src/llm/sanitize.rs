//! Leaked tool-call markup removal
//!
//! When tools are withheld, some models still emit their native tool-call
//! syntax as plain text. Each vendor has its own markup, so stripping is a
//! pluggable step selected by provider name. Adding a vendor quirk means
//! registering another sanitizer, nothing else changes.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Post-processes final answer text
pub trait ResponseSanitizer: Send + Sync {
    /// Short identifier, for logging
    fn name(&self) -> &str;

    /// Return `text` with leaked markup removed
    fn sanitize(&self, text: &str) -> String;
}

/// Removes every match of a fixed set of patterns
pub struct PatternSanitizer {
    name: String,
    patterns: Vec<Regex>,
}

impl PatternSanitizer {
    pub fn new(name: impl Into<String>, patterns: Vec<Regex>) -> Self {
        Self {
            name: name.into(),
            patterns,
        }
    }
}

impl ResponseSanitizer for PatternSanitizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn sanitize(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.patterns {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        cleaned
    }
}

// Unterminated blocks are stripped to the end of the text.
static DEEPSEEK_DSML: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<｜DSML｜function_calls>.*?(?:</｜DSML｜function_calls>|$)").unwrap()
});
static DEEPSEEK_NATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<｜tool▁calls▁begin｜>.*?(?:<｜tool▁calls▁end｜>|$)").unwrap()
});
static HERMES_TOOL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tool_call>.*?(?:</tool_call>|$)").unwrap());
static MINIMAX_TOOL_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<minimax:tool_call>.*?(?:</minimax:tool_call>|$)").unwrap()
});
static MISTRAL_TOOL_CALLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[TOOL_CALLS\].*$").unwrap());
static XML_FUNCTION_CALLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<function_calls>.*?(?:</function_calls>|$)").unwrap());

/// DeepSeek DSML and native tool-call blocks
pub fn deepseek() -> Arc<dyn ResponseSanitizer> {
    Arc::new(PatternSanitizer::new(
        "deepseek",
        vec![(*DEEPSEEK_DSML).clone(), (*DEEPSEEK_NATIVE).clone()],
    ))
}

/// Qwen / Hermes style `<tool_call>` blocks
pub fn hermes() -> Arc<dyn ResponseSanitizer> {
    Arc::new(PatternSanitizer::new("hermes", vec![(*HERMES_TOOL_CALL).clone()]))
}

/// MiniMax `<minimax:tool_call>` blocks
pub fn minimax() -> Arc<dyn ResponseSanitizer> {
    Arc::new(PatternSanitizer::new("minimax", vec![(*MINIMAX_TOOL_CALL).clone()]))
}

/// Mistral `[TOOL_CALLS]` tails
pub fn mistral() -> Arc<dyn ResponseSanitizer> {
    Arc::new(PatternSanitizer::new("mistral", vec![(*MISTRAL_TOOL_CALLS).clone()]))
}

/// Generic `<function_calls>` XML blocks
pub fn xml_function_calls() -> Arc<dyn ResponseSanitizer> {
    Arc::new(PatternSanitizer::new(
        "xml_function_calls",
        vec![(*XML_FUNCTION_CALLS).clone()],
    ))
}

/// Sanitizers keyed by provider name, with a fallback chain for providers
/// that have no specific entry
#[derive(Clone)]
pub struct SanitizerRegistry {
    by_provider: HashMap<String, Vec<Arc<dyn ResponseSanitizer>>>,
    fallback: Vec<Arc<dyn ResponseSanitizer>>,
}

impl SanitizerRegistry {
    /// A registry that changes nothing
    pub fn empty() -> Self {
        Self {
            by_provider: HashMap::new(),
            fallback: Vec::new(),
        }
    }

    /// Register a sanitizer for one provider
    pub fn register(&mut self, provider: impl Into<String>, sanitizer: Arc<dyn ResponseSanitizer>) {
        self.by_provider
            .entry(provider.into())
            .or_default()
            .push(sanitizer);
    }

    /// Register a sanitizer used for providers without a specific entry
    pub fn register_fallback(&mut self, sanitizer: Arc<dyn ResponseSanitizer>) {
        self.fallback.push(sanitizer);
    }

    /// Sanitizers that apply to `provider`
    pub fn for_provider(&self, provider: &str) -> &[Arc<dyn ResponseSanitizer>] {
        self.by_provider
            .get(provider)
            .map(Vec::as_slice)
            .unwrap_or(&self.fallback)
    }

    /// Clean `text` produced by `provider`
    pub fn sanitize(&self, provider: &str, text: &str) -> String {
        let mut cleaned = text.to_string();
        for sanitizer in self.for_provider(provider) {
            cleaned = sanitizer.sanitize(&cleaned);
        }
        cleaned.trim().to_string()
    }
}

impl Default for SanitizerRegistry {
    /// Every known vendor pattern as the fallback chain
    fn default() -> Self {
        let mut registry = Self::empty();
        for sanitizer in [deepseek(), hermes(), minimax(), mistral(), xml_function_calls()] {
            registry.register_fallback(sanitizer);
        }
        registry
    }
}
