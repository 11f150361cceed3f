//! Post-action outcome auditing.

use async_trait::async_trait;

use vigil_types::{
    Decision, EventKind, GuardHook, HookError, HookPoint, RunContext, StepEvent, Verdict,
};

const ANOMALY_INDICATORS: &[&str] = &[
    "error",
    "failed",
    "denied",
    "unauthorized",
    "unexpected",
    "malformed",
    "invalid",
];

/// Audits a completed tool result: execution status plus anomaly keywords
/// in the output.
///
/// Post-action hooks signal for the *next* step (the action already
/// happened), so this hook emits at most `SoftStop`, never `HardStop`.
pub struct OutcomeVerifier {
    _private: (),
}

impl OutcomeVerifier {
    /// Create a verifier.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn anomalies(output: &str) -> Vec<&'static str> {
        let lower = output.to_lowercase();
        ANOMALY_INDICATORS
            .iter()
            .copied()
            .filter(|indicator| lower.contains(indicator))
            .collect()
    }
}

impl Default for OutcomeVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuardHook for OutcomeVerifier {
    fn name(&self) -> &str {
        "outcome_verifier"
    }

    fn hook_point(&self) -> HookPoint {
        HookPoint::PostAction
    }

    async fn evaluate(&self, _ctx: &RunContext, event: &StepEvent) -> Result<Verdict, HookError> {
        if event.kind != EventKind::ToolResult || event.content.is_empty() {
            return Ok(Verdict::new(
                Decision::Proceed,
                0.9,
                "No tool result to verify",
            ));
        }

        let tool = event.tool_name.clone().unwrap_or_default();
        let status = event.status().unwrap_or("ok").to_owned();
        let anomalies = Self::anomalies(&event.content);

        let verdict = if status == "blocked" {
            Verdict::new(Decision::SoftStop, 0.8, "Tool was blocked")
        } else if event.risk >= 0.7 && !anomalies.is_empty() {
            Verdict::new(
                Decision::SoftStop,
                0.75,
                "High-risk tool completed with anomalous output",
            )
        } else if status == "error" {
            Verdict::new(Decision::LogOnly, 0.6, "Tool execution error")
        } else if !anomalies.is_empty() {
            Verdict::new(
                Decision::LogOnly,
                (anomalies.len() as f64 / 3.0).clamp(0.5, 1.0),
                format!("Anomalies detected: {}", anomalies.join(", ")),
            )
        } else {
            Verdict::new(Decision::Proceed, 0.95, "Outcome verified")
        };

        Ok(verdict
            .with_feature("status", status)
            .with_feature("tool", tool)
            .with_feature("anomalies", serde_json::json!(anomalies)))
    }
}
