//! Tool dispatch errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Name not in the catalog, or not offered in the current mode.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

impl ToolError {
    pub fn invalid(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
