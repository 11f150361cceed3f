//! The GuardHook interface: pluggable detection logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::HookError;
use crate::event::StepEvent;
use crate::id::RunId;
use crate::verdict::Verdict;

/// Where in the agent's step lifecycle a hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    /// Before an action is taken.
    PreAction,
    /// Between the action and its result.
    MidStep,
    /// After the result is observed.
    PostAction,
}

impl HookPoint {
    /// Wire name, as it appears in telemetry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreAction => "pre_action",
            Self::MidStep => "mid_step",
            Self::PostAction => "post_action",
        }
    }

    /// All three points, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::PreAction, Self::MidStep, Self::PostAction];
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A safeguard hook: one unit of detection logic at one hook point.
///
/// The runtime calls [`evaluate`](GuardHook::evaluate) for every step event
/// at the hook's point. Evaluation must be pure with respect to the context
/// and event: no mutation, and identical inputs produce identical decisions.
/// A hook may carry internal per-run state (a drift baseline, say); that
/// state is part of the hook's identity, must be keyed by [`RunId`], and is
/// released in [`run_ended`](GuardHook::run_ended).
///
/// Returning an error does NOT block the step: the orchestrator converts
/// failures to a `LOG_ONLY` verdict (or `HARD_STOP` when configured
/// fail-closed) and moves on to the next hook.
#[async_trait]
pub trait GuardHook: Send + Sync {
    /// Unique name. Two registered hooks may not share one.
    fn name(&self) -> &str;

    /// The single lifecycle point this hook fires at.
    fn hook_point(&self) -> HookPoint;

    /// Judge one step event against the current run context.
    async fn evaluate(&self, ctx: &RunContext, event: &StepEvent) -> Result<Verdict, HookError>;

    /// Called when a run starts. Hooks with per-run state opt in.
    fn run_started(&self, run_id: &RunId) {
        let _ = run_id;
    }

    /// Called when a run ends. Release any state keyed by this run.
    fn run_ended(&self, run_id: &RunId) {
        let _ = run_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_point_wire_names() {
        assert_eq!(HookPoint::PreAction.as_str(), "pre_action");
        assert_eq!(HookPoint::MidStep.as_str(), "mid_step");
        assert_eq!(HookPoint::PostAction.as_str(), "post_action");
    }

    #[test]
    fn hook_point_serde_round_trip() {
        let json = serde_json::to_string(&HookPoint::MidStep).unwrap();
        assert_eq!(json, "\"mid_step\"");
        let back: HookPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HookPoint::MidStep);
    }
}
