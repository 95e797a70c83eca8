//! Quality Gates Models

use serde::{Deserialize, Serialize};

/// Reason attached to verdicts produced by the count-based fallback.
pub const FALLBACK_REASON: &str = "件数ベースで判定しました。";
/// Failure reason when the judge rejected the action without saying why.
pub const ACTION_REJECTED_REASON: &str = "処理が妥当でないと判断されました。";
/// Failure reason when the goal was unmet without a stated reason.
pub const GOAL_UNMET_REASON: &str = "目的が未達でした。";

/// Outcome of validating one terminal result.
///
/// `action_ok == false` means the tool/argument choice itself was wrong and
/// must not be retried automatically. `success == false` alone means the
/// action was reasonable but fell short of the goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub success: bool,
    pub reason: String,
    pub action_ok: bool,
}

/// What the attempt loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Goal met; return the result.
    Finalize,
    /// Action rejected; discard the result and hand over to review.
    Escalate,
    /// Goal unmet; revise arguments and try again if attempts remain.
    Revise,
}

impl ValidationVerdict {
    pub fn new(success: bool, action_ok: bool, reason: impl Into<String>) -> Self {
        Self {
            success,
            reason: reason.into(),
            action_ok,
        }
    }

    pub fn fallback(success: bool) -> Self {
        Self::new(success, true, FALLBACK_REASON)
    }

    /// Escalation takes precedence over success.
    pub fn decision(&self) -> Decision {
        if !self.action_ok {
            Decision::Escalate
        } else if self.success {
            Decision::Finalize
        } else {
            Decision::Revise
        }
    }

    /// Reason reported to the caller on escalation.
    pub fn escalation_reason(&self) -> String {
        non_empty_or(&self.reason, ACTION_REJECTED_REASON)
    }

    /// Reason reported to the caller when the goal stayed unmet.
    pub fn unmet_reason(&self) -> String {
        non_empty_or(&self.reason, GOAL_UNMET_REASON)
    }
}

fn non_empty_or(reason: &str, default: &str) -> String {
    if reason.trim().is_empty() {
        default.to_string()
    } else {
        reason.to_string()
    }
}
