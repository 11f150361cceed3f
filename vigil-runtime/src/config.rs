//! Runtime configuration.

use std::time::Duration;

use vigil_escalation::EscalationPolicy;

use crate::compose::AggregationRule;

/// Configuration for a composed safeguard runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Global sensitivity knob in `[0, 1]`. Scales every derived
    /// threshold uniformly; higher is stricter.
    pub sensitivity: f64,
    /// When a hook errors or times out, convert the failure to `LOG_ONLY`
    /// (`true`, the default) or `HARD_STOP` (`false`).
    pub fail_open_on_hook_error: bool,
    /// Per-hook evaluation timeout. `None` means no limit.
    pub hook_timeout: Option<Duration>,
    /// How composed strategies combine cross-layer verdicts. The
    /// orchestrator's own per-pass aggregation is always most-restrictive.
    pub aggregation_rule: AggregationRule,
    /// Absolute override for the escalation drift threshold.
    pub drift_threshold: Option<f64>,
    /// Absolute override for the escalation violation threshold.
    pub violation_threshold: Option<u32>,
    /// Absolute override for the escalation uncertainty threshold.
    pub uncertainty_threshold: Option<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.5,
            fail_open_on_hook_error: true,
            hook_timeout: None,
            aggregation_rule: AggregationRule::MostRestrictive,
            drift_threshold: None,
            violation_threshold: None,
            uncertainty_threshold: None,
        }
    }
}

impl RuntimeConfig {
    /// The defaults: sensitivity 0.5, fail-open, no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sensitivity (clamped to `[0, 1]`).
    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity.clamp(0.0, 1.0);
        self
    }

    /// Fail closed: hook failures become `HARD_STOP`.
    #[must_use]
    pub fn fail_closed(mut self) -> Self {
        self.fail_open_on_hook_error = false;
        self
    }

    /// Set the per-hook timeout.
    #[must_use]
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = Some(timeout);
        self
    }

    /// Set the cross-layer aggregation rule.
    #[must_use]
    pub fn with_aggregation_rule(mut self, rule: AggregationRule) -> Self {
        self.aggregation_rule = rule;
        self
    }

    /// The escalation policy this configuration implies: thresholds
    /// derived from sensitivity, with any absolute overrides applied on
    /// top.
    #[must_use]
    pub fn escalation_policy(&self) -> EscalationPolicy {
        let mut policy = EscalationPolicy::from_sensitivity(self.sensitivity);
        if let Some(drift) = self.drift_threshold {
            policy.drift_threshold = drift;
        }
        if let Some(violations) = self.violation_threshold {
            policy.violation_threshold = violations;
        }
        if let Some(uncertainty) = self.uncertainty_threshold {
            policy.uncertainty_threshold = uncertainty;
        }
        policy
    }
}
