//! Validation-Retry Control Loop
//!
//! Per request:
//!
//! ```text
//! Attempt(1) ─▶ Validate ─┬─ success ──────────▶ Finalized
//!                         ├─ action rejected ──▶ Escalated (entry discarded)
//!                         └─ goal unmet ─▶ Reviser ─▶ Attempt(n+1) … Exhausted
//! ```
//!
//! Attempt 1 validates the orchestrator's terminal result; later attempts
//! re-run the mode's terminal tool directly with revised arguments. The
//! review loop patches arguments from human feedback and re-enters the same
//! cycle with a fresh attempt budget.

use serde_json::Value;
use tokyo_map_quality_gates::{revise, Decision, PatchRequest, ValidationVerdict, Validator};
use tokyo_map_tools::{Mode, ModeArgs, ToolOutput};

use crate::models::response::{AgentResponse, ReviewContext, REVIEW_PARSE_FAILED_MESSAGE};
use crate::services::orchestrator::Orchestrator;
use crate::services::summarizer::{Summarizer, SummaryRequest};
use crate::services::taxonomy::Taxonomy;
use crate::utils::error::{AppError, AppResult};

/// Failure reason reported when the chain produced no terminal result.
pub const EXTRACTION_FAILED_REASON: &str = "パラメータ抽出に失敗しました。";

/// Terminal state of one attempt loop.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Finalized {
        result: ToolOutput,
        verdict: ValidationVerdict,
        attempts: u32,
    },
    /// The action itself was rejected; the result's store entry is gone.
    Escalated {
        result: ToolOutput,
        verdict: ValidationVerdict,
        attempts: u32,
    },
    /// Every attempt fell short; the last result is kept.
    Exhausted {
        result: ToolOutput,
        verdict: ValidationVerdict,
        attempts: u32,
    },
}

impl AttemptOutcome {
    pub fn result(&self) -> &ToolOutput {
        match self {
            Self::Finalized { result, .. }
            | Self::Escalated { result, .. }
            | Self::Exhausted { result, .. } => result,
        }
    }

    pub fn verdict(&self) -> &ValidationVerdict {
        match self {
            Self::Finalized { verdict, .. }
            | Self::Escalated { verdict, .. }
            | Self::Exhausted { verdict, .. } => verdict,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Finalized { attempts, .. }
            | Self::Escalated { attempts, .. }
            | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

#[derive(Clone)]
pub struct ControlLoop {
    orchestrator: Orchestrator,
    validator: Validator,
    summarizer: Summarizer,
    max_iterations: u32,
}

impl ControlLoop {
    pub fn new(
        orchestrator: Orchestrator,
        validator: Validator,
        summarizer: Summarizer,
        max_iterations: u32,
    ) -> Self {
        Self {
            orchestrator,
            validator,
            summarizer,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Serve a free-text request in `mode`: chain, then the attempt loop.
    pub async fn handle_request(
        &self,
        taxonomy: &Taxonomy,
        user_text: &str,
        mode: Mode,
    ) -> AppResult<AgentResponse> {
        let chain = match self.orchestrator.run_chain(taxonomy, user_text, mode).await {
            Ok(chain) => chain,
            Err(e) if e.is_chain_failure() => {
                tracing::warn!("[control] chain failed: {}", e);
                let summary = self
                    .summarizer
                    .summarize(&SummaryRequest {
                        mode,
                        user_text,
                        args: empty_object(),
                        result: empty_object(),
                        success: false,
                        reason: EXTRACTION_FAILED_REASON,
                    })
                    .await;
                return Ok(AgentResponse::chain_failure(summary, EXTRACTION_FAILED_REASON));
            }
            Err(e) => return Err(e),
        };

        let args = chain.output.args.clone();
        let outcome = self
            .attempt_loop(taxonomy, user_text, args, Some(chain.output))
            .await?;
        Ok(self.respond(mode, user_text, outcome).await)
    }

    /// Patch the escalated arguments from `review_text` and re-enter the
    /// attempt loop.
    pub async fn handle_review(
        &self,
        taxonomy: &Taxonomy,
        review_text: &str,
        context: ReviewContext,
    ) -> AppResult<AgentResponse> {
        let request = PatchRequest {
            mode: context.mode,
            user_text: context.user_text.clone(),
            current_args: context.args.clone(),
            review_text: review_text.to_string(),
            last_result_stats: context
                .last_result
                .get("stats")
                .cloned()
                .unwrap_or(Value::Null),
        };

        let patched = self
            .validator
            .patch(&request)
            .await
            .ok_or_else(|| AppError::invalid_review(REVIEW_PARSE_FAILED_MESSAGE))?;
        let mut args = ModeArgs::from_value(context.mode, patched).map_err(|e| {
            AppError::invalid_review(format!("{}: {}", REVIEW_PARSE_FAILED_MESSAGE, e))
        })?;
        args.apply_range_defaults();
        tracing::info!("[control] review patched args: {}", args.to_value());

        let outcome = self
            .attempt_loop(taxonomy, &context.user_text, args, None)
            .await?;
        Ok(self.respond(context.mode, &context.user_text, outcome).await)
    }

    /// Validate and revise up to the attempt bound. With `first` set, attempt
    /// 1 validates it instead of running the tool.
    pub async fn attempt_loop(
        &self,
        taxonomy: &Taxonomy,
        user_text: &str,
        mut args: ModeArgs,
        first: Option<ToolOutput>,
    ) -> AppResult<AttemptOutcome> {
        let dispatcher = self.orchestrator.dispatcher();
        let mut pending = first;
        let mut attempt = 1;

        loop {
            let result = match pending.take() {
                Some(result) => result,
                None => dispatcher.run_mode(taxonomy, args.clone()).await?,
            };
            args = result.args.clone();

            let verdict = self.validator.validate(user_text, &args, &result).await;
            tracing::info!(
                "[control] attempt={} success={} action_ok={} reason={}",
                attempt,
                verdict.success,
                verdict.action_ok,
                verdict.reason
            );

            match verdict.decision() {
                Decision::Escalate => {
                    if let Some(store_id) = &result.store_id {
                        dispatcher.store().discard(store_id);
                    }
                    return Ok(AttemptOutcome::Escalated {
                        result,
                        verdict,
                        attempts: attempt,
                    });
                }
                Decision::Finalize => {
                    return Ok(AttemptOutcome::Finalized {
                        result,
                        verdict,
                        attempts: attempt,
                    });
                }
                Decision::Revise if attempt >= self.max_iterations => {
                    return Ok(AttemptOutcome::Exhausted {
                        result,
                        verdict,
                        attempts: self.max_iterations,
                    });
                }
                Decision::Revise => {
                    args = revise(&args, attempt);
                    attempt += 1;
                }
            }
        }
    }

    async fn respond(&self, mode: Mode, user_text: &str, outcome: AttemptOutcome) -> AgentResponse {
        let result = outcome.result();
        let verdict = outcome.verdict().clone();
        let args = result.args.to_value();

        let (success, reason) = match &outcome {
            AttemptOutcome::Finalized { .. } => (true, String::new()),
            AttemptOutcome::Escalated { .. } => (false, verdict.escalation_reason()),
            AttemptOutcome::Exhausted { .. } => (false, verdict.unmet_reason()),
        };
        let summary_reason = match &outcome {
            AttemptOutcome::Escalated { .. } => verdict.reason.clone(),
            _ => reason.clone(),
        };

        let summary = self
            .summarizer
            .summarize(&SummaryRequest {
                mode,
                user_text,
                args: args.clone(),
                result: result.to_value(),
                success,
                reason: &summary_reason,
            })
            .await;

        let escalated = matches!(outcome, AttemptOutcome::Escalated { .. });
        let trip = mode == Mode::Trip;

        AgentResponse {
            summary,
            store_id: if escalated { None } else { result.store_id.clone() },
            stats: result.stats.clone(),
            success,
            failure_reason: reason,
            require_review: escalated.then_some(true),
            review_reason: escalated.then(|| verdict.reason.clone()),
            review_context: escalated.then(|| ReviewContext {
                mode,
                user_text: user_text.to_string(),
                args: args.clone(),
                last_result: result.to_value(),
            }),
            evaluation: Some(verdict),
            attempts: outcome.attempts(),
            itinerary: if trip { result.itinerary.clone() } else { None },
            args: trip.then_some(args),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}
