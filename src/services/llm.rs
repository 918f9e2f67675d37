//! Chat-completion client for the hosted model.
//!
//! `LlmClient` is the seam the planner and agent talk to. `OpenAiClient`
//! speaks the `/chat/completions` wire format; `ScriptedLlmClient` replays
//! canned answers so the rest of the app can run without the network.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant turn that requested tools; must precede the matching tool results.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn to_openai_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    /// Ask the API to constrain the answer to a single JSON object.
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishReason {
    #[default]
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("stop") | None => FinishReason::Stop,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(_) => FinishReason::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            finish_reason: FinishReason::ToolCalls,
            ..Default::default()
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("missing API key: set OPENAI_API_KEY")]
    MissingApiKey,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}

pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    pub fn build_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_wire).collect();

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_openai_schema()).collect();
            body["tools"] = json!(tools);
        }
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        if self.config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let body = self.build_body(&request);
        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        let parsed = parse_completion(&body)?;
        debug!(
            finish = ?parsed.finish_reason,
            tokens = parsed.usage.total(),
            tool_calls = parsed.tool_calls.len(),
            "chat completion received"
        );
        Ok(parsed)
    }
}

fn message_to_wire(message: &ChatMessage) -> Value {
    let mut wire = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });
    if !message.tool_calls.is_empty() {
        let calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();
        wire["tool_calls"] = json!(calls);
        if message.content.is_empty() {
            wire["content"] = Value::Null;
        }
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    wire
}

/// Turns a `/chat/completions` response body into a `ChatResponse`.
pub fn parse_completion(body: &Value) -> Result<ChatResponse, LlmError> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices".into()))?;
    let message = &choice["message"];

    let content = message["content"].as_str().unwrap_or_default().to_string();

    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .map(|call| {
                    let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
                    // models occasionally send bare text instead of an arguments object
                    let arguments = serde_json::from_str(raw_args)
                        .unwrap_or_else(|_| json!({ "input": raw_args }));
                    ToolCall::new(
                        call["id"].as_str().unwrap_or_default(),
                        call["function"]["name"].as_str().unwrap_or_default(),
                        arguments,
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let usage = Usage {
        prompt_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
    };

    Ok(ChatResponse {
        content,
        tool_calls,
        finish_reason: FinishReason::parse(choice["finish_reason"].as_str()),
        usage,
    })
}

/// Replays queued responses in order and records every request it saw.
#[derive(Clone, Default)]
pub struct ScriptedLlmClient {
    responses: Arc<Mutex<VecDeque<ChatResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    pub fn push(&self, response: ChatResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .ok_or_else(|| LlmError::InvalidResponse("no scripted response left".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> OpenAiClient {
        OpenAiClient::new(LlmConfig {
            api_key: "sk-test".into(),
            base_url: "http://localhost:9/v1/".into(),
            model: "gpt-test".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn body_includes_tools_and_json_mode() {
        let tool = ToolDefinition {
            name: "wikipedia".into(),
            description: "Look things up".into(),
            parameters: json!({"type": "object"}),
        };
        let request = ChatRequest::new(vec![ChatMessage::system("sys"), ChatMessage::user("hi")])
            .with_tools(vec![tool])
            .json();
        let body = client().build_body(&request);

        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["tools"][0]["function"]["name"], "wikipedia");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(client().endpoint(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn tool_turns_use_the_wire_shape() {
        let call = ToolCall::new("call_1", "park_lookup", json!({"park_name": "Zion"}));
        let assistant = message_to_wire(&ChatMessage::assistant_tool_calls("", vec![call]));
        assert!(assistant["content"].is_null());
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], r#"{"park_name":"Zion"}"#);

        let result = message_to_wire(&ChatMessage::tool_result("call_1", "{}"));
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_1");
    }

    #[test]
    fn parses_text_completion() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 30}
        });
        let parsed = parse_completion(&body).unwrap();
        assert_eq!(parsed.content, "{\"a\":1}");
        assert_eq!(parsed.finish_reason, FinishReason::Stop);
        assert_eq!(parsed.usage.total(), 42);
        assert!(!parsed.wants_tools());
    }

    #[test]
    fn parses_tool_calls_and_falls_back_on_bad_arguments() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "c1", "type": "function", "function": {"name": "wikipedia", "arguments": "{\"query\":\"Zion\"}"}},
                        {"id": "c2", "type": "function", "function": {"name": "park_lookup", "arguments": "Yosemite"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let parsed = parse_completion(&body).unwrap();
        assert_eq!(parsed.finish_reason, FinishReason::ToolCalls);
        assert_eq!(parsed.tool_calls[0].arguments["query"], "Zion");
        assert_eq!(parsed.tool_calls[1].arguments["input"], "Yosemite");
        assert!(parsed.content.is_empty());
    }

    #[test]
    fn empty_choices_is_invalid() {
        let err = parse_completion(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenAiClient::new(LlmConfig {
            api_key: " ".into(),
            base_url: "http://localhost:9/v1".into(),
            model: "m".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = client.complete(ChatRequest::default()).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order() {
        let scripted = ScriptedLlmClient::new([ChatResponse::text("one")]);
        scripted.push(ChatResponse::text("two"));

        let first = scripted.complete(ChatRequest::default()).await.unwrap();
        let second = scripted.complete(ChatRequest::default()).await.unwrap();
        assert_eq!(first.content, "one");
        assert_eq!(second.content, "two");
        assert!(scripted.complete(ChatRequest::default()).await.is_err());
        assert_eq!(scripted.requests().len(), 3);
        assert_eq!(scripted.remaining(), 0);
    }
}
