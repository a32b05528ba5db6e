//! OpenAI-compatible chat completions client
//!
//! Speaks the `/chat/completions` dialect shared by OpenAI, Groq,
//! OpenRouter, Ollama and most self-hosted gateways. One instance is created
//! per configured provider and registered under its model-id prefix.
//!
//! Streaming calls send `stream: true` and read the server-sent event body
//! line by line, forwarding text deltas and stitching tool-call fragments
//! back together by index.

use crate::client::{DeltaSink, ModelClient};
use crate::completion::{ModelRequest, ModelResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::tools::{ToolCall, ToolDefinition};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default OpenAI API base URL
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Client configuration
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// Provider name used in logs
    pub name: String,
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Bearer token; local servers may not need one
    pub api_key: Option<String>,
    /// HTTP timeout
    pub timeout: Duration,
}

impl fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

impl OpenAiCompatConfig {
    /// Configuration for the public OpenAI endpoint
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: OPENAI_API_BASE.to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Set the HTTP timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible provider client
pub struct OpenAiCompatClient {
    client: Client,
    config: OpenAiCompatConfig,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize)]
struct ChatTool {
    r#type: &'static str,
    function: ChatFunction,
}

#[derive(Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<ChatUsage> for TokenUsage {
    fn from(usage: ChatUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Upper bound on parallel tool calls in one streamed reply
const MAX_STREAMED_TOOL_CALLS: usize = 64;

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Rebuilds a [`ModelResponse`] from streamed chunks
#[derive(Default)]
struct StreamAccumulator {
    content: String,
    tool_calls: Vec<PartialToolCall>,
    usage: Option<TokenUsage>,
    finish_reason: Option<String>,
}

impl StreamAccumulator {
    /// Feed one line of the event stream; returns `true` at `[DONE]`
    fn push_line(&mut self, line: &str, on_delta: DeltaSink<'_>) -> Result<bool> {
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(false);
        };
        let data = data.trim();
        if data.is_empty() {
            return Ok(false);
        }
        if data == "[DONE]" {
            return Ok(true);
        }

        let chunk: StreamChunk = serde_json::from_str(data)
            .map_err(|e| Error::InvalidResponse(format!("bad stream chunk: {e}")))?;
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage.into());
        }
        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                on_delta(&text);
                self.content.push_str(&text);
            }
            for delta in choice.delta.tool_calls.unwrap_or_default() {
                if delta.index >= MAX_STREAMED_TOOL_CALLS {
                    return Err(Error::InvalidResponse(format!(
                        "tool call index {} out of range",
                        delta.index
                    )));
                }
                if self.tool_calls.len() <= delta.index {
                    self.tool_calls
                        .resize_with(delta.index + 1, PartialToolCall::default);
                }
                let slot = &mut self.tool_calls[delta.index];
                if let Some(id) = delta.id {
                    slot.id = id;
                }
                if let Some(function) = delta.function {
                    slot.name.push_str(function.name.as_deref().unwrap_or_default());
                    slot.arguments
                        .push_str(function.arguments.as_deref().unwrap_or_default());
                }
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }
        Ok(false)
    }

    fn finish(self) -> ModelResponse {
        ModelResponse {
            content: (!self.content.is_empty()).then_some(self.content),
            tool_calls: self
                .tool_calls
                .into_iter()
                .filter(|tc| !tc.name.is_empty())
                .map(|tc| ToolCall::new(tc.id, tc.name, tc.arguments))
                .collect(),
            usage: self.usage,
            finish_reason: self.finish_reason,
        }
    }
}

impl OpenAiCompatClient {
    /// Create a client
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &OpenAiCompatConfig {
        &self.config
    }

    fn convert_message(msg: &Message) -> ChatMessage {
        ChatMessage {
            role: msg.role.as_str(),
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    r#type: function_type(),
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
            name: msg.name.clone(),
        }
    }

    fn request_body(request: &ModelRequest, stream: bool) -> ChatRequest<'_> {
        ChatRequest {
            model: &request.model,
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.iter().map(Self::convert_tool).collect(),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.config.timeout.as_secs())
        } else {
            Error::from(e)
        }
    }

    /// POST the body and fail on a non-success status
    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let mut http = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(body);
        if let Some(key) = &self.config.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }
        Ok(response)
    }

    fn convert_tool(tool: &ToolDefinition) -> ChatTool {
        ChatTool {
            r#type: "function",
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

/// Map an HTTP failure status to the router's error classes
fn classify_status(status: StatusCode, body: &str) -> Error {
    let detail = if body.len() > 300 {
        format!("{}...", &body[..body.char_indices().nth(300).map_or(body.len(), |(i, _)| i)])
    } else {
        body.to_string()
    };
    match status.as_u16() {
        429 => Error::RateLimit,
        401 | 403 => Error::Auth(format!("HTTP {status}")),
        408 => Error::Timeout(0),
        500..=599 => Error::Server(format!("HTTP {status}: {detail}")),
        400..=499 => Error::InvalidRequest(format!("HTTP {status}: {detail}")),
        _ => Error::Api(format!("HTTP {status}: {detail}")),
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(skip(self, request), fields(provider = %self.config.name, model = %request.model, tools = request.tools.len()))]
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse> {
        debug!("Sending chat completion request");
        let response = self.send(&Self::request_body(&request, false)).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();

        Ok(ModelResponse {
            content: choice.message.content,
            tool_calls,
            usage: chat.usage.map(TokenUsage::from),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request, on_delta), fields(provider = %self.config.name, model = %request.model, tools = request.tools.len()))]
    async fn call_stream(
        &self,
        request: ModelRequest,
        on_delta: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ModelResponse> {
        debug!("Sending streaming chat completion request");
        let mut response = self.send(&Self::request_body(&request, true)).await?;

        let mut accumulator = StreamAccumulator::default();
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            buffer.extend_from_slice(&chunk);
            while let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                let line = String::from_utf8_lossy(&line);
                if accumulator.push_line(line.trim_end(), on_delta)? {
                    return Ok(accumulator.finish());
                }
            }
        }
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer).into_owned();
            accumulator.push_line(line.trim_end(), on_delta)?;
        }
        Ok(accumulator.finish())
    }
}
