//! Topic drift monitoring against a per-run baseline.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use vigil_types::{
    Decision, GuardHook, HookError, HookPoint, RunContext, RunId, StepEvent, Verdict,
};

use crate::adjusted_threshold;

const RISKY_KEYWORDS: &[&str] = &["hack", "bypass", "exploit", "attack", "steal", "trick"];
const SENSITIVE_KEYWORDS: &[&str] = &["password", "credential", "private", "secret", "personal"];

const HARD_BASE: f64 = 0.7;
/// Soft threshold as a fraction of the hard threshold.
const SOFT_FRACTION: f64 = 0.6;

/// Topic keyword counts for one text sample.
#[derive(Debug, Clone, Copy, Default)]
struct TopicCounts {
    risky: usize,
    sensitive: usize,
}

fn extract_topics(text: &str) -> TopicCounts {
    let lower = text.to_lowercase();
    let count = |keywords: &[&str]| keywords.iter().filter(|kw| lower.contains(*kw)).count();
    TopicCounts {
        risky: count(RISKY_KEYWORDS),
        sensitive: count(SENSITIVE_KEYWORDS),
    }
}

/// Monitors semantic drift from the stated goal.
///
/// On its first invocation for a run it extracts a topic baseline from the
/// stated goal; subsequent invocations compare the conversation against
/// that baseline. The per-step score combines drift (risky topics beyond
/// the baseline) with escalation (overall risky/sensitive density), and
/// the decision thresholds the run's cumulative total. Baselines are keyed
/// by run and released in [`run_ended`](GuardHook::run_ended).
pub struct DriftMonitor {
    sensitivity: f64,
    point: HookPoint,
    baselines: Mutex<HashMap<RunId, TopicCounts>>,
}

impl DriftMonitor {
    /// Create a monitor with the given sensitivity in `[0, 1]`. Fires at
    /// `mid_step` unless moved with [`at_point`](Self::at_point).
    #[must_use]
    pub fn new(sensitivity: f64) -> Self {
        Self {
            sensitivity: sensitivity.clamp(0.0, 1.0),
            point: HookPoint::MidStep,
            baselines: Mutex::new(HashMap::new()),
        }
    }

    /// Move the monitor to a different lifecycle point. Drift can be
    /// watched before actions as well as between them.
    #[must_use]
    pub fn at_point(mut self, point: HookPoint) -> Self {
        self.point = point;
        self
    }

    fn baseline_for(&self, ctx: &RunContext) -> TopicCounts {
        let mut baselines = self
            .baselines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *baselines.entry(ctx.run_id.clone()).or_insert_with(|| {
            extract_topics(ctx.stated_goal.as_deref().unwrap_or_default())
        })
    }

    fn step_score(baseline: TopicCounts, current: TopicCounts) -> (f64, f64) {
        let drift = if current.risky > baseline.risky {
            (((current.risky - baseline.risky) as f64) / 3.0).min(1.0)
        } else {
            0.0
        };
        let escalation = (((current.risky + current.sensitive) as f64) / 4.0).min(1.0);
        (0.6 * drift + 0.4 * escalation, escalation)
    }
}

impl Default for DriftMonitor {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl GuardHook for DriftMonitor {
    fn name(&self) -> &str {
        "drift_monitor"
    }

    fn hook_point(&self) -> HookPoint {
        self.point
    }

    async fn evaluate(&self, ctx: &RunContext, event: &StepEvent) -> Result<Verdict, HookError> {
        let baseline = self.baseline_for(ctx);
        let text = format!("{}\n{}", ctx.conversation_text(), event.content);
        let current = extract_topics(&text);

        let (combined, escalation) = Self::step_score(baseline, current);
        let total = ctx.cumulative_drift + combined * 0.2;

        let hard = adjusted_threshold(HARD_BASE, self.sensitivity);
        let soft = hard * SOFT_FRACTION;

        let verdict = if total >= hard {
            Verdict::new(
                Decision::HardStop,
                0.9,
                format!("Significant drift detected (total: {total:.2})"),
            )
        } else if total >= soft {
            Verdict::new(
                Decision::SoftStop,
                0.7,
                format!("Drift threshold approaching (total: {total:.2})"),
            )
        } else if combined >= 0.2 {
            Verdict::new(Decision::LogOnly, 0.6, "Minor drift detected")
        } else {
            Verdict::new(Decision::Proceed, 0.95, "Trajectory on track")
        };

        Ok(verdict
            .with_feature("drift_score", total)
            .with_feature("step_drift", combined)
            .with_feature("escalation", escalation)
            .with_feature("threshold", hard))
    }

    fn run_ended(&self, run_id: &RunId) {
        self.baselines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(run_id);
    }
}
