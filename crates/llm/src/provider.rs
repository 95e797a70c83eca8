//! Provider seam.
//!
//! Every model call in the agent (tool selection, judging, patching,
//! summaries) goes through one `send_message` request/response exchange.
//! Tests substitute scripted providers here.

use async_trait::async_trait;

use crate::error::LlmResult;
use crate::message::Message;
use crate::schema::ToolDefinition;
use crate::types::{LlmRequestOptions, LlmResponse, ProviderConfig};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider id for logs, e.g. `openai`.
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    /// Send `messages` with an optional system prompt. `tools` are offered
    /// unless `options.tool_call_mode` is `None`.
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    fn config(&self) -> &ProviderConfig;
}
