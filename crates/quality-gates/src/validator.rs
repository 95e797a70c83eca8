//! Validator
//!
//! Judges a terminal result against the original request. The primary path
//! delegates to a `JudgmentCapability` (an LLM in production) with a
//! low-temperature prompt; when it is unavailable or its answer cannot be
//! parsed, a count-based fallback decides.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tokyo_map_tools::{Mode, ModeArgs, ToolOutput};

use crate::models::ValidationVerdict;

/// Minimum total results for a search to count as achieved.
const SEARCH_MIN_TOTAL: usize = 5;
/// Trip totals must reach this share of `days × per_day`.
const TRIP_FILL_RATIO: f64 = 0.95;
/// Each day must reach this share of `per_day`.
const TRIP_DAY_RATIO: f64 = 0.8;

/// Trip-specific figures handed to the judge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripFigures {
    pub spots: usize,
    pub days: u32,
    pub per_day: u32,
    pub day_counts: Vec<usize>,
}

/// Everything the judge sees about one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeRequest {
    pub mode: Mode,
    pub user_text: String,
    pub args: Value,
    pub stats: IndexMap<String, usize>,
    pub total: usize,
    #[serde(flatten)]
    pub trip: Option<TripFigures>,
}

impl JudgeRequest {
    pub fn new(user_text: &str, args: &ModeArgs, result: &ToolOutput) -> Self {
        let trip = match args {
            ModeArgs::Trip(trip_args) => {
                let day_counts = result.day_counts();
                Some(TripFigures {
                    spots: day_counts.iter().sum(),
                    days: trip_args.effective_days(),
                    per_day: trip_args.effective_per_day(),
                    day_counts,
                })
            }
            ModeArgs::Search(_) => None,
        };
        Self {
            mode: args.mode(),
            user_text: user_text.to_string(),
            args: args.to_value(),
            stats: result.stats.clone(),
            total: result.total_count(),
            trip,
        }
    }
}

/// Input to a review patch: the human feedback plus the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchRequest {
    pub mode: Mode,
    pub user_text: String,
    pub current_args: Value,
    pub review_text: String,
    pub last_result_stats: Value,
}

/// Pluggable judgment: verdicts for results, argument patches for reviews.
/// `None` means the capability is unavailable or produced nothing usable.
#[async_trait]
pub trait JudgmentCapability: Send + Sync {
    async fn judge(&self, request: &JudgeRequest) -> Option<ValidationVerdict>;

    async fn patch(&self, request: &PatchRequest) -> Option<Value>;
}

/// Capability that never answers, leaving every verdict to the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJudgment;

#[async_trait]
impl JudgmentCapability for NoJudgment {
    async fn judge(&self, _request: &JudgeRequest) -> Option<ValidationVerdict> {
        None
    }

    async fn patch(&self, _request: &PatchRequest) -> Option<Value> {
        None
    }
}

/// Count-based verdict.
///
/// - search: `total >= 5`
/// - trip: `spots >= max(3, floor(days × per_day × 0.95))` and every day has
///   at least `max(1, floor(per_day × 0.8))` items
pub fn fallback_verdict(request: &JudgeRequest) -> ValidationVerdict {
    match &request.trip {
        None => ValidationVerdict::fallback(request.total >= SEARCH_MIN_TOTAL),
        Some(trip) => {
            let planned = (trip.days * trip.per_day) as f64;
            let threshold = ((planned * TRIP_FILL_RATIO).floor() as usize).max(3);
            let per_day_min = ((trip.per_day as f64 * TRIP_DAY_RATIO).floor() as usize).max(1);
            let day_ok = trip.day_counts.iter().all(|&c| c >= per_day_min);
            ValidationVerdict::fallback(trip.spots >= threshold && day_ok)
        }
    }
}

/// `(system, user)` prompt pair for the judge.
pub fn build_judge_prompt(request: &JudgeRequest) -> (String, String) {
    let payload = serde_json::to_string(request).unwrap_or_default();
    let (role, bar) = match request.mode {
        Mode::Search => (
            "You validate map search results for a Tokyo geodata agent. Apply standard strictness.",
            "Standard strictness: total >= 5 is roughly achieved, but strict conditions may justify \
             an unmet verdict. With several categories, also consider whether the results are heavily skewed.",
        ),
        Mode::Trip => (
            "You validate trip itineraries for a Tokyo geodata agent. Apply standard strictness.",
            "Standard strictness: spots should reach days*per_day*0.95, and days with noticeably \
             few items may be judged unmet.",
        ),
    };
    let user = format!(
        "Review the information below. First judge whether the action taken (tool choice, \
         arguments, result) was reasonable, then whether the goal was achieved. {}\n\
         Reply only with JSON {{\"success\": true/false, \"reason\": \"...\", \"action_ok\": true/false}}.\n{}",
        bar, payload
    );
    (role.to_string(), user)
}

/// `(system, user)` prompt pair for a review patch.
pub fn build_patch_prompt(request: &PatchRequest) -> (String, String) {
    let payload = serde_json::to_string(request).unwrap_or_default();
    (
        "You revise search conditions according to a user's review.".to_string(),
        format!(
            "Revise the search conditions following the review below. Keep edits minimal, and do \
             not change category or place unless the review explicitly asks for it. Reply with \
             the revised args as a JSON object only.\n{}",
            payload
        ),
    )
}

/// Parse a judge reply into a verdict. `None` if no JSON object is found.
pub fn parse_verdict(response: &str) -> Option<ValidationVerdict> {
    let data = extract_object(response)?;
    let success = data.get("success").is_some_and(truthy);
    let action_ok = data.get("action_ok").map_or(true, truthy);
    let reason = match data.get("reason") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Some(ValidationVerdict::new(success, action_ok, reason))
}

/// Parse a patch reply into an args object.
pub fn parse_patch(response: &str) -> Option<Value> {
    extract_object(response).map(Value::Object)
}

/// Direct parse first, then the span from the first `{` to the last `}`
/// (covers markdown fences and chatter around the JSON).
fn extract_object(response: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(response.trim()) {
        return Some(map);
    }
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&response[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Validates results through a capability, falling back to counts.
#[derive(Clone)]
pub struct Validator {
    capability: Arc<dyn JudgmentCapability>,
}

impl Validator {
    pub fn new(capability: Arc<dyn JudgmentCapability>) -> Self {
        Self { capability }
    }

    /// Validator that always uses the count-based fallback.
    pub fn deterministic() -> Self {
        Self::new(Arc::new(NoJudgment))
    }

    pub async fn validate(
        &self,
        user_text: &str,
        args: &ModeArgs,
        result: &ToolOutput,
    ) -> ValidationVerdict {
        let request = JudgeRequest::new(user_text, args, result);
        match self.capability.judge(&request).await {
            Some(verdict) => verdict,
            None => {
                let verdict = fallback_verdict(&request);
                tracing::debug!(
                    "[validator] fallback verdict mode={} total={} success={}",
                    request.mode,
                    request.total,
                    verdict.success
                );
                verdict
            }
        }
    }

    pub async fn patch(&self, request: &PatchRequest) -> Option<Value> {
        self.capability.patch(request).await
    }
}
