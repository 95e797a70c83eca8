//! Short natural-language summary of a request's outcome. Never fails: a
//! provider error yields a fixed fallback text.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokyo_map_llm::{LlmProvider, LlmRequestOptions, Message, ToolCallMode};
use tokyo_map_tools::Mode;

pub const SUMMARY_FALLBACK: &str = "要約生成に失敗しました。";

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are an assistant that summarizes briefly in Japanese. On failure, also explain why.";
const SUMMARY_TEMPERATURE: f32 = 0.2;
const SUMMARY_MAX_TOKENS: u32 = 200;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest<'a> {
    pub mode: Mode,
    pub user_text: &'a str,
    pub args: Value,
    pub result: Value,
    pub success: bool,
    pub reason: &'a str,
}

#[derive(Clone)]
pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn summarize(&self, request: &SummaryRequest<'_>) -> String {
        let payload = serde_json::to_string(request).unwrap_or_default();
        let user = format!(
            "Read the information below and summarize it concisely. On success, add a short hint \
             useful for the next step. On failure, explain the reason in one phrase and suggest \
             how to adjust the conditions.\n{}",
            payload
        );
        let options = LlmRequestOptions::labeled("summarize")
            .with_temperature(SUMMARY_TEMPERATURE)
            .with_max_tokens(SUMMARY_MAX_TOKENS)
            .with_tool_call_mode(ToolCallMode::None);

        match self
            .provider
            .send_message(
                vec![Message::user(user)],
                Some(SUMMARY_SYSTEM_PROMPT.to_string()),
                Vec::new(),
                options,
            )
            .await
        {
            Ok(response) => response.text_or_empty().to_string(),
            Err(e) => {
                tracing::warn!("[summarizer] {}", e);
                SUMMARY_FALLBACK.to_string()
            }
        }
    }
}
