//! OpenAI chat-completions provider.
//!
//! Works against any OpenAI-compatible endpoint through `base_url`. The
//! transcript maps onto the wire as follows: tool results become `tool`
//! messages, tool uses become `tool_calls` on the assistant message.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LlmError, LlmResult};
use crate::http_client::build_http_client;
use crate::message::{Message, MessageContent, MessageRole, ToolCall};
use crate::provider::LlmProvider;
use crate::schema::{ParameterSchema, ToolDefinition};
use crate::types::{
    LlmRequestOptions, LlmResponse, ProviderConfig, StopReason, ToolCallMode, UsageStats,
};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client =
            build_http_client(Duration::from_secs(config.timeout_secs), None).map_err(LlmError::network)?;
        let endpoint = resolve_endpoint(config.base_url.as_deref());
        Ok(Self {
            config,
            client,
            endpoint,
        })
    }

    fn request<'a>(
        &'a self,
        messages: &'a [Message],
        system: Option<&'a str>,
        tools: &'a [ToolDefinition],
        options: &LlmRequestOptions,
    ) -> ChatRequest<'a> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system {
            wire.push(WireMessage::text("system", system.to_string()));
        }
        for message in messages {
            push_message(&mut wire, message);
        }

        let offer_tools = !tools.is_empty() && options.tool_call_mode != ToolCallMode::None;
        ChatRequest {
            model: &self.config.model,
            messages: wire,
            max_tokens: options.max_tokens_override.unwrap_or(self.config.max_tokens),
            temperature: options.temperature_override.unwrap_or(self.config.temperature),
            tools: offer_tools.then(|| tools.iter().map(WireTool::from).collect()),
            tool_choice: offer_tools.then(|| match options.tool_call_mode {
                ToolCallMode::Required => "required",
                _ => "auto",
            }),
            extra: &self.config.options,
        }
    }
}

fn resolve_endpoint(base_url: Option<&str>) -> String {
    match base_url.map(|b| b.trim_end_matches('/')) {
        Some(base) if base.ends_with("/chat/completions") => base.to_string(),
        Some(base) => format!("{}/chat/completions", base),
        None => DEFAULT_ENDPOINT.to_string(),
    }
}

/// Append the wire form of `message`. A user turn carrying tool results
/// expands to one `tool` message per result.
fn push_message(wire: &mut Vec<WireMessage>, message: &Message) {
    let mut tool_calls = Vec::new();
    for block in &message.content {
        match block {
            MessageContent::ToolResult {
                tool_use_id,
                content,
                ..
            } => wire.push(WireMessage {
                role: "tool",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(tool_use_id.clone()),
            }),
            MessageContent::ToolUse { id, name, input } => tool_calls.push(WireToolCall {
                id: id.clone(),
                kind: "function".to_string(),
                function: WireFunction {
                    name: name.clone(),
                    arguments: match input {
                        Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    },
                },
            }),
            MessageContent::Text { .. } => {}
        }
    }

    let text = message.text_content();
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };
    if !tool_calls.is_empty() {
        wire.push(WireMessage {
            role,
            content: (!text.is_empty()).then_some(text),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        });
    } else if !text.is_empty() || !has_tool_results(message) {
        wire.push(WireMessage::text(role, text));
    }
}

fn has_tool_results(message: &Message) -> bool {
    message
        .content
        .iter()
        .any(|c| matches!(c, MessageContent::ToolResult { .. }))
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

impl ChatResponse {
    fn into_response(self) -> LlmResponse {
        let usage = self
            .usage
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let Some(choice) = self.choices.into_iter().next() else {
            return LlmResponse {
                content: None,
                tool_calls: Vec::new(),
                stop_reason: StopReason::EndTurn,
                usage,
                model: self.model,
            };
        };

        let stop_reason = choice
            .finish_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);
        let message = choice.message.unwrap_or_default();
        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: decode_arguments(call.function.arguments),
            })
            .collect();

        LlmResponse {
            content: message.content,
            tool_calls,
            stop_reason,
            usage,
            model: self.model,
        }
    }
}

/// Blank arguments mean none; malformed JSON is kept as a string.
fn decode_arguments(raw: String) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::missing_api_key(self.name()))?;

        let body = self.request(&messages, system.as_deref(), &tools, &options);
        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::network)?;

        let status = response.status();
        let retry_after = retry_after_secs(response.headers());
        let text = response.text().await.map_err(LlmError::network)?;
        tracing::debug!(
            "[llm] label={} model={} status={} elapsed={:.2}s",
            options.label_or_dash(),
            self.config.model,
            status.as_u16(),
            started.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), &text, retry_after));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;
        Ok(parsed.into_response())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(flatten)]
    extra: &'a HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    /// Serialized as `null` next to tool calls; some compatible servers
    /// reject a missing field.
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &'static str, text: String) -> Self {
        Self {
            role,
            content: Some(text),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a ParameterSchema,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(tool: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireToolFunction {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.input_schema,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
