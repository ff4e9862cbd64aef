//! Model provider abstractions.
//!
//! Defines the [`ModelProvider`] trait, the [`ChatMessage`] type, and
//! parsing helpers for OpenAI-style chat-completion responses.  The
//! concrete backend is [`openai_compat::OpenAICompatProvider`].

pub mod openai_compat;

use async_trait::async_trait;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// ChatMessage – shared message representation
// ---------------------------------------------------------------------------

/// A single chat message with a role and content.
///
/// Optionally carries tool-calling metadata so that `tool` role
/// messages and assistant `tool_calls` responses are serialised
/// correctly for the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// For assistant messages that invoke tools.
    pub tool_calls: Vec<FunctionCallItem>,
    /// For `role: "tool"` messages: the id of the call answered.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Plain message (no tool metadata).
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Assistant message requesting `calls`.
    pub fn tool_request(calls: Vec<FunctionCallItem>) -> Self {
        Self {
            role: "assistant".into(),
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// Result of the call identified by `call_id`.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".into(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Serialise messages into the OpenAI-compatible JSON array format.
pub fn serialize_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let mut msg = json!({ "role": m.role });
            if m.tool_calls.is_empty() {
                msg["content"] = json!(m.content);
            } else {
                msg["tool_calls"] = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": { "name": c.name, "arguments": c.arguments },
                        })
                    })
                    .collect();
                // The API expects null content on assistant tool-call messages.
                msg["content"] = if m.content.is_empty() {
                    Value::Null
                } else {
                    json!(m.content)
                };
            }
            if let Some(ref id) = m.tool_call_id {
                msg["tool_call_id"] = json!(id);
            }
            msg
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ModelProvider trait
// ---------------------------------------------------------------------------

/// Trait implemented by every LLM backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send chat messages together with tool definitions (`{"name",
    /// "description", "parameters"}` objects) and return either the
    /// final text or the tool calls the model requested.
    async fn send_chat_with_functions(
        &self,
        messages: &[ChatMessage],
        functions: &[Value],
    ) -> anyhow::Result<ProviderResponse>;
}

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallItem {
    pub id: String,
    pub name: String,
    /// Raw JSON-encoded arguments string.
    pub arguments: String,
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse {
    /// Plain text reply.
    Final(String),
    /// One or more tool invocations, in order.
    ToolCalls(Vec<FunctionCallItem>),
}

/// Token counts reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Extract `usage` from a chat completion response.
pub fn parse_token_usage(json: &Value) -> Option<TokenUsage> {
    let usage = json.get("usage")?;
    Some(TokenUsage {
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(0),
    })
}

/// Parse `tool_calls` (or the legacy `function_call`) from a chat
/// completion response.  Returns `None` when the model answered with
/// text only.
pub fn parse_tool_calls(json: &Value) -> Option<Vec<FunctionCallItem>> {
    let message = json.get("choices")?.get(0)?.get("message")?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        let items: Vec<FunctionCallItem> = tool_calls
            .iter()
            .enumerate()
            .filter_map(|(i, tc)| {
                let func = tc.get("function")?;
                let name = func.get("name")?.as_str()?.to_string();
                let arguments = func
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or("{}")
                    .to_string();
                let id = tc
                    .get("id")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| format!("call_{i}"));
                Some(FunctionCallItem { id, name, arguments })
            })
            .collect();
        if !items.is_empty() {
            return Some(items);
        }
    }

    let fc = message.get("function_call")?.as_object()?;
    let name = fc.get("name")?.as_str()?.to_string();
    let arguments = fc
        .get("arguments")
        .and_then(Value::as_str)
        .unwrap_or("{}")
        .to_string();
    Some(vec![FunctionCallItem {
        id: "call_0".into(),
        name,
        arguments,
    }])
}

/// Parse a whole chat completion response.
pub fn parse_response(json: &Value) -> ProviderResponse {
    if let Some(calls) = parse_tool_calls(json) {
        return ProviderResponse::ToolCalls(calls);
    }
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();
    ProviderResponse::Final(content)
}
