//! Shared test helpers: a scripted in-process LLM provider

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cortex::core::{CortexError, Message, Result, ToolCall, ToolDefinition};
use cortex::llm::{GenerateOptions, LLMProvider, LLMResponse};

/// One recorded `chat` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub max_tokens: Option<u32>,
}

enum Step {
    Respond(LLMResponse),
    Fail(String),
}

/// Replays a fixed script of responses, then an optional repeating one
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    repeat: Option<LLMResponse>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(responses.into_iter().map(Step::Respond).collect()),
            repeat: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answer every call with `response`
    pub fn repeating(response: LLMResponse) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Fail every call with a provider error
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::from([Step::Fail(message.to_string())])),
            repeat: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        _model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name().to_string()).collect(),
            max_tokens: options.and_then(|o| o.max_tokens),
        });

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(message)) => Err(CortexError::provider(message)),
            None => self
                .repeat
                .clone()
                .ok_or_else(|| CortexError::provider("script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A response requesting one tool call
pub fn call(id: &str, name: &str, args: serde_json::Value) -> LLMResponse {
    LLMResponse::with_tool_calls(vec![ToolCall::new(id, name, args.to_string())])
}

/// A plain text response
pub fn text(content: &str) -> LLMResponse {
    LLMResponse::text(content)
}
