//! Shared types used across Cortex modules
//!
//! Contains message structures, tool calls and tool definitions.

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A message in a conversation
///
/// A `tool` message always answers one entry of the `tool_calls` of an
/// earlier `assistant` message, identified by `tool_call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Text content, possibly empty
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool results, the id of the originating call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name for tool results, or a tag for synthetic system messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provider reasoning trace, echoed back verbatim on later requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            reasoning_content: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message recording tool calls
    pub fn assistant_with_tools(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        reasoning_content: Option<String>,
    ) -> Self {
        Self {
            tool_calls,
            reasoning_content,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Create a tool result message answering `call`
    pub fn tool(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// Tag this message with a name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this message requests tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call made by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, echoed back on the matching tool message
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON-encoded arguments, exactly as produced by the model
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument text as JSON. Empty text is treated as `{}`.
    pub fn parsed_arguments(&self) -> serde_json::Result<serde_json::Value> {
        if self.arguments.trim().is_empty() {
            return Ok(serde_json::json!({}));
        }
        serde_json::from_str(&self.arguments)
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Create a definition from a flat parameter list
    pub fn from_parameters(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: &[ToolParameter],
    ) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in parameters {
            properties.insert(param.name.clone(), param.schema());
            if param.required {
                required.push(serde_json::Value::String(param.name.clone()));
            }
        }

        Self::function(
            name,
            description,
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }

    /// Name of the tool
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// One parameter of a tool, rendered into JSON Schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    /// JSON Schema type: string, integer, number, boolean, array, object
    pub kind: String,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl ToolParameter {
    fn new(name: &str, kind: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
            required,
            enum_values: Vec::new(),
        }
    }

    /// A required string parameter
    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, "string", description, true)
    }

    /// A required integer parameter
    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, "integer", description, true)
    }

    /// A required boolean parameter
    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, "boolean", description, true)
    }

    /// A required array-of-strings parameter
    pub fn string_array(name: &str, description: &str) -> Self {
        Self::new(name, "array", description, true)
    }

    /// Mark the parameter optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Restrict a string parameter to a fixed set of values
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    fn schema(&self) -> serde_json::Value {
        let mut schema = serde_json::json!({
            "type": self.kind,
            "description": self.description,
        });
        if self.kind == "array" {
            schema["items"] = serde_json::json!({ "type": "string" });
        }
        if !self.enum_values.is_empty() {
            schema["enum"] = serde_json::json!(self.enum_values);
        }
        schema
    }
}
