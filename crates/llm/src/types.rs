//! Request options, provider configuration and responses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ToolCall;

/// Whether the model may, must or must not call tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallMode {
    #[default]
    Auto,
    Required,
    None,
}

/// Per-call overrides of the provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmRequestOptions {
    #[serde(default)]
    pub tool_call_mode: ToolCallMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_override: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_override: Option<u32>,
    /// Call site name for log lines, e.g. `chain_search` or `judge`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LlmRequestOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature_override = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens_override = Some(max_tokens);
        self
    }

    pub fn with_tool_call_mode(mut self, mode: ToolCallMode) -> Self {
        self.tool_call_mode = mode;
        self
    }

    pub fn label_or_dash(&self) -> &str {
        self.label.as_deref().unwrap_or("-")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// OpenAI-compatible endpoint; `None` means the public API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra top-level request fields, e.g. `seed`.
    #[serde(default)]
    pub options: HashMap<String, Value>,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            options: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl UsageStats {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    Other(String),
}

impl From<&str> for StopReason {
    /// Accepts both chat-completions (`stop`, `length`, `tool_calls`) and
    /// messages-style (`end_turn`, `max_tokens`, `tool_use`) spellings.
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "stop" | "end_turn" => Self::EndTurn,
            "length" | "max_tokens" => Self::MaxTokens,
            "tool_calls" | "tool_use" | "function_call" => Self::ToolUse,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub usage: UsageStats,
    pub model: String,
}

impl LlmResponse {
    /// Text-only answer.
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
            usage: UsageStats::default(),
            model: model.into(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}
