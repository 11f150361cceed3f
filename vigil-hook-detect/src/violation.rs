//! Mid-trajectory policy violation monitoring.

use async_trait::async_trait;

use vigil_types::{Decision, GuardHook, HookError, HookPoint, RunContext, StepEvent, Verdict};

const VIOLATION_MARKERS: &[&str] = &[
    "unauthorized",
    "illegal",
    "prohibited",
    "restricted",
    "confidential",
    "classified",
    "harmful",
    "dangerous",
];

/// Watches in-flight steps for policy-violation markers.
///
/// A marker in the step content blocks outright; a high declared risk
/// without markers pauses for confirmation.
pub struct ViolationMonitor {
    _private: (),
}

impl ViolationMonitor {
    /// Create a monitor.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for ViolationMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuardHook for ViolationMonitor {
    fn name(&self) -> &str {
        "violation_monitor"
    }

    fn hook_point(&self) -> HookPoint {
        HookPoint::MidStep
    }

    async fn evaluate(&self, _ctx: &RunContext, event: &StepEvent) -> Result<Verdict, HookError> {
        let lower = event.content.to_lowercase();
        let violations: Vec<&str> = VIOLATION_MARKERS
            .iter()
            .copied()
            .filter(|marker| lower.contains(marker))
            .collect();

        if let Some(first) = violations.first() {
            return Ok(Verdict::new(
                Decision::HardStop,
                1.0,
                format!("Violation detected: {first}"),
            )
            .with_feature("violations", serde_json::json!(violations)));
        }

        if event.risk >= 0.8 {
            return Ok(
                Verdict::new(Decision::SoftStop, event.risk, "High-risk action")
                    .with_feature("action_risk", event.risk),
            );
        }

        Ok(Verdict::new(Decision::Proceed, 0.95, "No violations detected"))
    }
}
