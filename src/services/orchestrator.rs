//! Orchestrator
//!
//! Drives the bounded tool-calling conversation with the model:
//!
//! ```text
//! AwaitingModel ─ tool calls ──▶ ToolExecuting ─ terminal ─▶ Finalized
//!      │  ▲                            │
//!      │  └──────── non-terminal ──────┘
//!      └─ no tool call ─▶ Nudging (once) ─▶ AwaitingModel
//! ```
//!
//! A second answer without tool calls fails the chain, as does running out
//! of model turns. Store writes made along a failing path are kept.

use std::sync::Arc;

use tokyo_map_llm::{LlmProvider, LlmRequestOptions, LlmResponse, Message, ToolCallMode, ToolDefinition};
use tokyo_map_tools::{tool_definitions, Mode, ToolInvocation, ToolName, ToolOutput};

use crate::services::dispatcher::Dispatcher;
use crate::services::taxonomy::Taxonomy;
use crate::utils::error::{AppError, AppResult};

pub const SYSTEM_PROMPT: &str = "You are a geodata agent restricted to the Tokyo Metropolis. \
Choose the appropriate tools for the user's goal on your own; you may solve it in several steps. \
Extract categories, place and conditions (radius, 24-hour opening, wheelchair access, result count) \
as the user intends them. With several categories, choose between combining single-category searches \
and one bulk search. When a preferred range (narrow/standard/wide) can be read from the request, \
set `range` accordingly; vague distance wording is fine, infer the best range from context.";

/// Corrective instruction sent once when the model answers without a tool.
pub const NUDGE_TEXT: &str =
    "検索または旅行計画のリクエストです。必ず適切なツールを使って結果を取得してください。";

const CHAIN_TEMPERATURE: f32 = 0.2;
const CHAIN_MAX_TOKENS: u32 = 300;

/// Terminal result of a successful chain.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub output: ToolOutput,
    /// Tool that produced the terminal result.
    pub tool: ToolName,
    /// Model turns used, nudge included.
    pub steps: usize,
}

#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    dispatcher: Dispatcher,
    max_steps: usize,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, dispatcher: Dispatcher, max_steps: usize) -> Self {
        Self {
            provider,
            dispatcher,
            max_steps: max_steps.max(1),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one chain for `user_text` offering only `mode`'s tools.
    pub async fn run_chain(
        &self,
        taxonomy: &Taxonomy,
        user_text: &str,
        mode: Mode,
    ) -> AppResult<ChainOutcome> {
        let tools = tool_definitions(mode, &taxonomy.category_names());
        let mut messages = vec![Message::user(user_text)];
        let mut nudged = false;

        for step in 1..=self.max_steps {
            let response = self.call_model(&messages, &tools, mode).await?;

            if !response.has_tool_calls() {
                if nudged {
                    tracing::warn!("[orchestrator] no tool call after nudge, step={}", step);
                    return Err(AppError::parameter_extraction("no tool calls"));
                }
                tracing::info!("[orchestrator] no tool call, nudging, step={}", step);
                messages.push(Message::assistant(response.text_or_empty()));
                messages.push(Message::user(NUDGE_TEXT));
                nudged = true;
                continue;
            }

            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                &response.tool_calls,
            ));

            // In order; the first terminal result ends the chain and the
            // rest of the batch is dropped.
            for call in &response.tool_calls {
                let invocation = ToolInvocation::decode(&call.name, call.arguments.clone(), mode)?;
                let tool = invocation.tool();
                let output = self.dispatcher.execute(taxonomy, invocation).await?;
                messages.push(Message::tool_result(call.id.clone(), output.to_content(), false));

                if output.is_terminal() {
                    tracing::info!(
                        "[orchestrator] terminal result from {} at step {}",
                        tool,
                        step
                    );
                    return Ok(ChainOutcome {
                        output,
                        tool,
                        steps: step,
                    });
                }
            }
        }

        tracing::warn!("[orchestrator] tool steps exceeded ({})", self.max_steps);
        Err(AppError::ToolStepsExceeded(self.max_steps))
    }

    /// One model turn; a retryable provider error is retried once.
    async fn call_model(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        mode: Mode,
    ) -> AppResult<LlmResponse> {
        let options = LlmRequestOptions::labeled(format!("chain_{}", mode))
            .with_temperature(CHAIN_TEMPERATURE)
            .with_max_tokens(CHAIN_MAX_TOKENS)
            .with_tool_call_mode(ToolCallMode::Auto);

        let send = || {
            self.provider.send_message(
                messages.to_vec(),
                Some(SYSTEM_PROMPT.to_string()),
                tools.to_vec(),
                options.clone(),
            )
        };

        match send().await {
            Ok(response) => Ok(response),
            Err(e) if e.is_retryable() => {
                tracing::warn!("[orchestrator] model call failed ({}), retrying once", e);
                Ok(send().await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
