//! Escalation policy: converting raw safeguard signals into one of six
//! graded responses.
//!
//! The policy is a pure function: an [`EscalationPolicy`] holds three
//! thresholds, [`evaluate`](EscalationPolicy::evaluate) walks a fixed
//! cascade over the supplied [`EscalationSignals`], and the first matching
//! branch wins. Identical inputs always yield identical outcomes.
//!
//! Escalation is a terminal step outside the hook orchestrator: the caller
//! feeds it the aggregated per-step signals and decides what to do with
//! the outcome (fold it into the verdict via
//! [`EscalationLevel::as_decision`], or surface the user message directly).

#![deny(missing_docs)]

use serde::{Deserialize, Serialize};

use vigil_types::Decision;

/// Graded escalation levels, least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    /// All signals within normal range.
    None,
    /// Ask the user for clarification.
    Clarify,
    /// Warn (log) but continue.
    Warn,
    /// Pause execution.
    SoftStop,
    /// Block execution.
    HardStop,
    /// Flag for human review.
    HumanReview,
}

impl EscalationLevel {
    /// Map the level into the verdict decision space, for callers that
    /// fold the outcome back into an aggregated verdict. `None` maps to
    /// nothing, since there is no upgrade to apply.
    #[must_use]
    pub const fn as_decision(self) -> Option<Decision> {
        match self {
            Self::None => None,
            Self::Clarify | Self::SoftStop => Some(Decision::SoftStop),
            Self::Warn => Some(Decision::LogOnly),
            Self::HardStop => Some(Decision::HardStop),
            Self::HumanReview => Some(Decision::HumanReview),
        }
    }
}

/// The per-step signals the cascade consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationSignals {
    /// Cumulative drift from the stated goal.
    pub drift_score: f64,
    /// Policy violations observed so far.
    pub violation_count: u32,
    /// Planner uncertainty (1 − confidence).
    pub uncertainty: f64,
    /// Risk level of the current tool.
    pub tool_risk: f64,
    /// Steps executed so far.
    pub step_count: u64,
}

/// The outcome of one escalation evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    /// The graded response.
    pub level: EscalationLevel,
    /// Why this level was chosen.
    pub reason: String,
    /// Canonical user-facing message, when the level carries one.
    pub user_message: Option<String>,
}

/// Canonical user-facing messages, one per level that addresses the user.
mod messages {
    pub const VIOLATION: &str = "I cannot continue with this request due to policy concerns.";
    pub const SEVERE_DRIFT: &str =
        "This conversation has deviated significantly from the original request.";
    pub const HUMAN_REVIEW: &str = "This request has been flagged for human review.";
    pub const DRIFT_PAUSE: &str = "I'd like to clarify something before continuing.";
    pub const RISKY_TOOL: &str = "This action requires additional confirmation.";
    pub const CLARIFY: &str =
        "Could you provide more details about what you're trying to accomplish?";
}

/// Determines the appropriate escalation from combined safeguard signals.
///
/// The cascade is ordered; the first condition matched wins:
///
/// 1. `violation_count >= violation_threshold` → `HardStop`
/// 2. `drift_score >= 0.8` → `HardStop`
/// 3. `drift_score >= 0.6` and `uncertainty >= uncertainty_threshold` → `HumanReview`
/// 4. `drift_score >= drift_threshold` → `SoftStop`
/// 5. `tool_risk >= 0.7` → `SoftStop`
/// 6. `uncertainty >= uncertainty_threshold` → `Clarify`
/// 7. `drift_score >= 0.3` → `Warn`
/// 8. otherwise → `None`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscalationPolicy {
    /// Drift at or above this pauses execution.
    pub drift_threshold: f64,
    /// Violations at or above this block execution.
    pub violation_threshold: u32,
    /// Uncertainty at or above this asks for clarification.
    pub uncertainty_threshold: f64,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            drift_threshold: 0.5,
            violation_threshold: 1,
            uncertainty_threshold: 0.4,
        }
    }
}

impl EscalationPolicy {
    /// The default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive thresholds from a global sensitivity knob in `[0, 1]`.
    /// Higher sensitivity means lower thresholds, i.e. stricter behavior:
    /// `drift = 0.5 × (1.1 − s)`, `uncertainty = 0.4 × (1.1 − s)`.
    #[must_use]
    pub fn from_sensitivity(sensitivity: f64) -> Self {
        let s = sensitivity.clamp(0.0, 1.0);
        Self {
            drift_threshold: 0.5 * (1.1 - s),
            violation_threshold: 1,
            uncertainty_threshold: 0.4 * (1.1 - s),
        }
    }

    /// Tighten thresholds for a risky context: both the drift and
    /// uncertainty thresholds shrink by `1 − 0.3 × context_risk`.
    #[must_use]
    pub fn adjusted_for_context(mut self, context_risk: f64) -> Self {
        let factor = 1.0 - context_risk.clamp(0.0, 1.0) * 0.3;
        self.drift_threshold *= factor;
        self.uncertainty_threshold *= factor;
        self
    }

    /// Run the cascade. Pure: no state, no side effects.
    #[must_use]
    pub fn evaluate(&self, signals: &EscalationSignals) -> EscalationOutcome {
        if signals.violation_count >= self.violation_threshold {
            return EscalationOutcome {
                level: EscalationLevel::HardStop,
                reason: format!(
                    "Policy violation detected ({} violations)",
                    signals.violation_count
                ),
                user_message: Some(messages::VIOLATION.to_owned()),
            };
        }

        if signals.drift_score >= 0.8 {
            return EscalationOutcome {
                level: EscalationLevel::HardStop,
                reason: format!("Severe drift from stated goal ({:.2})", signals.drift_score),
                user_message: Some(messages::SEVERE_DRIFT.to_owned()),
            };
        }

        if signals.drift_score >= 0.6 && signals.uncertainty >= self.uncertainty_threshold {
            return EscalationOutcome {
                level: EscalationLevel::HumanReview,
                reason: "High drift combined with uncertainty".to_owned(),
                user_message: Some(messages::HUMAN_REVIEW.to_owned()),
            };
        }

        if signals.drift_score >= self.drift_threshold {
            return EscalationOutcome {
                level: EscalationLevel::SoftStop,
                reason: format!("Drift threshold exceeded ({:.2})", signals.drift_score),
                user_message: Some(messages::DRIFT_PAUSE.to_owned()),
            };
        }

        if signals.tool_risk >= 0.7 {
            return EscalationOutcome {
                level: EscalationLevel::SoftStop,
                reason: format!("High-risk tool ({:.2})", signals.tool_risk),
                user_message: Some(messages::RISKY_TOOL.to_owned()),
            };
        }

        if signals.uncertainty >= self.uncertainty_threshold {
            return EscalationOutcome {
                level: EscalationLevel::Clarify,
                reason: format!("High uncertainty ({:.2})", signals.uncertainty),
                user_message: Some(messages::CLARIFY.to_owned()),
            };
        }

        if signals.drift_score >= 0.3 {
            return EscalationOutcome {
                level: EscalationLevel::Warn,
                reason: format!("Minor drift detected ({:.2})", signals.drift_score),
                user_message: None,
            };
        }

        EscalationOutcome {
            level: EscalationLevel::None,
            reason: "All signals within normal range".to_owned(),
            user_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(drift: f64, violations: u32, uncertainty: f64, tool_risk: f64) -> EscalationSignals {
        EscalationSignals {
            drift_score: drift,
            violation_count: violations,
            uncertainty,
            tool_risk,
            step_count: 0,
        }
    }

    // --- Cascade branches, in order ---

    #[test]
    fn violations_block_first() {
        let policy = EscalationPolicy::new();
        // Even with severe drift, the violation branch wins.
        let outcome = policy.evaluate(&signals(0.9, 2, 0.9, 0.9));
        assert_eq!(outcome.level, EscalationLevel::HardStop);
        assert!(outcome.reason.contains("2 violations"));
    }

    #[test]
    fn severe_drift_blocks() {
        let outcome = EscalationPolicy::new().evaluate(&signals(0.85, 0, 0.0, 0.0));
        assert_eq!(outcome.level, EscalationLevel::HardStop);
        assert_eq!(
            outcome.user_message.as_deref(),
            Some("This conversation has deviated significantly from the original request.")
        );
    }

    #[test]
    fn drift_with_uncertainty_flags_for_review() {
        let outcome = EscalationPolicy::new().evaluate(&signals(0.65, 0, 0.5, 0.2));
        assert_eq!(outcome.level, EscalationLevel::HumanReview);
        assert_eq!(
            outcome.user_message.as_deref(),
            Some("This request has been flagged for human review.")
        );
    }

    #[test]
    fn drift_alone_pauses() {
        let outcome = EscalationPolicy::new().evaluate(&signals(0.55, 0, 0.1, 0.0));
        assert_eq!(outcome.level, EscalationLevel::SoftStop);
    }

    #[test]
    fn risky_tool_pauses() {
        let outcome = EscalationPolicy::new().evaluate(&signals(0.1, 0, 0.1, 0.8));
        assert_eq!(outcome.level, EscalationLevel::SoftStop);
        assert_eq!(
            outcome.user_message.as_deref(),
            Some("This action requires additional confirmation.")
        );
    }

    #[test]
    fn uncertainty_alone_clarifies() {
        let outcome = EscalationPolicy::new().evaluate(&signals(0.1, 0, 0.6, 0.0));
        assert_eq!(outcome.level, EscalationLevel::Clarify);
    }

    #[test]
    fn minor_drift_warns_without_a_message() {
        let outcome = EscalationPolicy::new().evaluate(&signals(0.35, 0, 0.0, 0.0));
        assert_eq!(outcome.level, EscalationLevel::Warn);
        assert!(outcome.user_message.is_none());
    }

    #[test]
    fn quiet_signals_need_nothing() {
        let outcome = EscalationPolicy::new().evaluate(&signals(0.0, 0, 0.0, 0.0));
        assert_eq!(outcome.level, EscalationLevel::None);
        assert!(outcome.user_message.is_none());
    }

    // --- Threshold derivation ---

    #[test]
    fn sensitivity_tightens_thresholds() {
        let lax = EscalationPolicy::from_sensitivity(0.0);
        let strict = EscalationPolicy::from_sensitivity(1.0);
        assert!(strict.drift_threshold < lax.drift_threshold);
        assert!(strict.uncertainty_threshold < lax.uncertainty_threshold);
        // s = 0.5 lands on the defaults' formula: 0.5 * 0.6 = 0.30.
        let mid = EscalationPolicy::from_sensitivity(0.5);
        assert!((mid.drift_threshold - 0.30).abs() < 1e-9);
        assert!((mid.uncertainty_threshold - 0.24).abs() < 1e-9);
    }

    #[test]
    fn context_risk_tightens_further() {
        let base = EscalationPolicy::from_sensitivity(0.5);
        let adjusted = base.adjusted_for_context(1.0);
        assert!((adjusted.drift_threshold - base.drift_threshold * 0.7).abs() < 1e-9);
        assert!((adjusted.uncertainty_threshold - base.uncertainty_threshold * 0.7).abs() < 1e-9);
        assert_eq!(adjusted.violation_threshold, base.violation_threshold);
    }

    #[test]
    fn levels_map_into_decision_space() {
        assert_eq!(EscalationLevel::None.as_decision(), None);
        assert_eq!(
            EscalationLevel::HumanReview.as_decision(),
            Some(vigil_types::Decision::HumanReview)
        );
        assert_eq!(
            EscalationLevel::Warn.as_decision(),
            Some(vigil_types::Decision::LogOnly)
        );
    }
}
