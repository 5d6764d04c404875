//! OpenAI-compatible provider
//!
//! Talks to any `/chat/completions` endpoint (OpenAI, DeepSeek, vLLM,
//! OpenRouter, ...). `reasoning_content` on assistant turns is sent back
//! verbatim because some reasoning models reject follow-up requests
//! without it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, CortexError, Message, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{FinishReason, GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reasoning_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            api_key: config.llm.api_key.clone(),
            temperature: config.llm.temperature,
        })
    }

    fn to_wire_message(msg: &Message) -> WireMessage {
        let tool_calls = if msg.tool_calls.is_empty() {
            None
        } else {
            Some(
                msg.tool_calls
                    .iter()
                    .map(|tc| WireToolCall {
                        id: tc.id.clone(),
                        call_type: function_type(),
                        function: WireFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            )
        };

        WireMessage {
            role: msg.role.to_string(),
            content: Some(msg.content.clone()),
            reasoning_content: msg.reasoning_content.clone(),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn to_llm_response(response: CompletionResponse) -> Result<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CortexError::provider("Response contained no choices"))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: if tc.id.is_empty() {
                    format!("call_{}", uuid::Uuid::new_v4().simple())
                } else {
                    tc.id
                },
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(LLMResponse {
            finish_reason: FinishReason::from_provider(
                choice.finish_reason.as_deref(),
                !tool_calls.is_empty(),
            ),
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            reasoning_content: choice.message.reasoning_content,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: response.model,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let options = options.unwrap_or_default();
        let request = CompletionRequest {
            model,
            messages: messages.iter().map(Self::to_wire_message).collect(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            temperature: options.temperature.or(self.temperature),
            max_tokens: options.max_tokens,
            stop: options.stop,
        };

        debug!(
            model,
            messages = messages.len(),
            tools = tools.len(),
            "sending chat completion request"
        );

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/chat/completions", self.base_url))
                    .json(&request),
            )
            .send()
            .await
            .map_err(|e| CortexError::provider(format!("Request to {} failed: {}", self.base_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 404 && error_text.contains("model") {
                return Err(CortexError::ModelNotFound(model.to_string()));
            }
            return Err(CortexError::provider(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CortexError::provider(format!("Failed to parse response: {}", e)))?;

        Self::to_llm_response(body)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorized(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CortexError::provider("Failed to list models"));
        }

        let list: ModelList = response.json().await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_content_is_echoed() {
        let call = ToolCall::new("call_1", "exec", r#"{"command":"ls"}"#);
        let msg = Message::assistant_with_tools("", vec![call], Some("plan".into()));
        let wire = OpenAiProvider::to_wire_message(&msg);
        assert_eq!(wire.reasoning_content.as_deref(), Some("plan"));
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["arguments"], r#"{"command":"ls"}"#);
    }

    #[test]
    fn test_tool_result_carries_call_id() {
        let call = ToolCall::new("call_9", "exec", "{}");
        let wire = OpenAiProvider::to_wire_message(&Message::tool(&call, "done"));
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_9"));
    }

    #[test]
    fn test_parse_completion() {
        let raw = r#"{
            "model": "deepseek-reasoner",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "reasoning_content": "need a listing",
                    "tool_calls": [{"id": "abc", "type": "function",
                        "function": {"name": "exec", "arguments": "{\"command\":\"ls\"}"}}]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        let response = OpenAiProvider::to_llm_response(parsed).unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls[0].id, "abc");
        assert_eq!(response.reasoning_content.as_deref(), Some("need a listing"));
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    }

    #[test]
    fn test_empty_choices_is_error() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(OpenAiProvider::to_llm_response(parsed).is_err());
    }
}
