//! Tokyo Map Quality Gates
//!
//! Decides whether a terminal tool result satisfies the request, and how
//! arguments are widened before the next attempt.
//!
//! ## Module Organization
//!
//! - `models` - `ValidationVerdict`, `Decision` and the fixed reason strings
//! - `validator` - `JudgmentCapability`, prompts/parsing for judge and patch
//!   calls, the deterministic fallback and the `Validator`
//! - `reviser` - deterministic, monotonic argument revision

pub mod models;
pub mod reviser;
pub mod validator;

pub use models::{
    Decision, ValidationVerdict, ACTION_REJECTED_REASON, FALLBACK_REASON, GOAL_UNMET_REASON,
};
pub use reviser::{revise, revise_search, revise_trip};
pub use validator::{
    build_judge_prompt, build_patch_prompt, fallback_verdict, parse_patch, parse_verdict,
    JudgeRequest, JudgmentCapability, NoJudgment, PatchRequest, Validator,
};
