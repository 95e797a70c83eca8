//! Model-backed judgment: verdicts for terminal results and argument
//! patches for human reviews. Any provider error or unusable answer comes
//! back as `None`, leaving the decision to the validator's fallback.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokyo_map_llm::{LlmProvider, LlmRequestOptions, Message, ToolCallMode};
use tokyo_map_quality_gates::{
    build_judge_prompt, build_patch_prompt, parse_patch, parse_verdict, JudgeRequest,
    JudgmentCapability, PatchRequest, ValidationVerdict,
};

const JUDGE_TEMPERATURE: f32 = 0.0;
const JUDGE_MAX_TOKENS: u32 = 120;
const PATCH_TEMPERATURE: f32 = 0.2;
const PATCH_MAX_TOKENS: u32 = 200;

pub struct LlmJudgment {
    provider: Arc<dyn LlmProvider>,
}

impl LlmJudgment {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    async fn ask(&self, system: String, user: String, options: LlmRequestOptions) -> Option<String> {
        let label = options.label.clone().unwrap_or_default();
        match self
            .provider
            .send_message(vec![Message::user(user)], Some(system), Vec::new(), options)
            .await
        {
            Ok(response) => Some(response.text_or_empty().to_string()),
            Err(e) => {
                tracing::warn!("[judge] {} call failed on {}: {}", label, self.provider.model(), e);
                None
            }
        }
    }
}

#[async_trait]
impl JudgmentCapability for LlmJudgment {
    async fn judge(&self, request: &JudgeRequest) -> Option<ValidationVerdict> {
        let (system, user) = build_judge_prompt(request);
        let options = LlmRequestOptions::labeled("judge")
            .with_temperature(JUDGE_TEMPERATURE)
            .with_max_tokens(JUDGE_MAX_TOKENS)
            .with_tool_call_mode(ToolCallMode::None);
        let text = self.ask(system, user, options).await?;
        let verdict = parse_verdict(&text);
        if verdict.is_none() {
            tracing::warn!("[judge] unparseable verdict: {}", truncate(&text));
        }
        verdict
    }

    async fn patch(&self, request: &PatchRequest) -> Option<Value> {
        let (system, user) = build_patch_prompt(request);
        let options = LlmRequestOptions::labeled("patch")
            .with_temperature(PATCH_TEMPERATURE)
            .with_max_tokens(PATCH_MAX_TOKENS)
            .with_tool_call_mode(ToolCallMode::None);
        let text = self.ask(system, user, options).await?;
        let patched = parse_patch(&text);
        if patched.is_none() {
            tracing::warn!("[judge] unparseable patch: {}", truncate(&text));
        }
        patched
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(120).collect()
}
