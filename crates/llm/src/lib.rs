//! Tokyo Map LLM
//!
//! A narrow request/response interface to a chat-completion model:
//! - `LlmProvider` trait, implemented by `OpenAIProvider`
//! - transcript, tool-definition and response types
//! - the shared HTTP client factory

pub mod error;
pub mod http_client;
pub mod message;
pub mod openai;
pub mod provider;
pub mod schema;
pub mod types;

pub use error::{LlmError, LlmResult};
pub use http_client::build_http_client;
pub use message::{Message, MessageContent, MessageRole, ToolCall};
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use schema::{ParameterSchema, ToolDefinition};
pub use types::{
    LlmRequestOptions, LlmResponse, ProviderConfig, StopReason, ToolCallMode, UsageStats,
};
