//! Tokyo Map Tools
//!
//! The capabilities exposed to the orchestrating model:
//! - `ToolName` / `Mode` - the exhaustive tool catalog and per-mode tool sets
//! - `tool_definitions` - JSON schemas handed to the model
//! - `SearchArgs`, `TripArgs`, ... - validated parameter bags with range-tier
//!   defaults and clamps
//! - `ToolInvocation` - a tool call decoded into its typed arguments
//! - `ToolOutput` / `ResultType` - what every tool returns
//!
//! Execution lives in the application crate; this crate is pure.

pub mod args;
pub mod catalog;
pub mod error;
pub mod invocation;
pub mod output;

pub use args::{
    CategorySearchArgs, ItineraryArgs, MergeArgs, ModeArgs, RangeTier, SearchArgs, TripArgs,
};
pub use catalog::{tool_definitions, Mode, ToolName};
pub use error::{ToolError, ToolResult};
pub use invocation::ToolInvocation;
pub use output::{ResultType, ToolOutput};
