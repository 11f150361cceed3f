//! Intent classification before an action executes.

use async_trait::async_trait;
use regex::Regex;

use vigil_types::{Decision, GuardHook, HookError, HookPoint, RunContext, StepEvent, Verdict};

use crate::adjusted_threshold;

const MALICIOUS_PATTERNS: &[&str] = &[
    r"bypass\s+(safety|security|filter|moderation)",
    r"ignore\s+(previous|prior|safety|guidelines)",
    r"(hack|exploit|attack|breach)\s+",
    r"(disable|remove)\s+(safety|filter|restriction)",
    r"pretend\s+(you\s+are|to\s+be)",
];

const HIGH_RISK_KEYWORDS: &[&str] = &[
    "password",
    "credential",
    "secret",
    "private",
    "hack",
    "exploit",
    "vulnerability",
    "bypass",
    "injection",
    "malware",
    "virus",
    "attack",
];

const HARD_BASE: f64 = 0.7;
const SOFT_FRACTION: f64 = 0.6;

/// Classifies intent from the conversation plus the action about to run.
///
/// Three signals feed a fixed weighted sum: malicious-pattern density
/// (weight 0.4), high-risk keyword density (0.3), and the action's
/// declared risk (0.3). The combined score is thresholded the same way
/// the drift monitor thresholds its total.
pub struct IntentClassifier {
    sensitivity: f64,
    patterns: Vec<Regex>,
}

impl IntentClassifier {
    /// Create a classifier with the given sensitivity in `[0, 1]`.
    #[must_use]
    pub fn new(sensitivity: f64) -> Self {
        let patterns = MALICIOUS_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
            .collect();
        Self {
            sensitivity: sensitivity.clamp(0.0, 1.0),
            patterns,
        }
    }

    fn malicious_score(&self, text: &str) -> f64 {
        let matches = self.patterns.iter().filter(|p| p.is_match(text)).count();
        (matches as f64 / 3.0).min(1.0)
    }

    fn keyword_score(text: &str) -> f64 {
        let lower = text.to_lowercase();
        let hits = HIGH_RISK_KEYWORDS
            .iter()
            .filter(|kw| lower.contains(*kw))
            .count();
        (hits as f64 / 5.0).min(1.0)
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl GuardHook for IntentClassifier {
    fn name(&self) -> &str {
        "intent_classifier"
    }

    fn hook_point(&self) -> HookPoint {
        HookPoint::PreAction
    }

    async fn evaluate(&self, ctx: &RunContext, event: &StepEvent) -> Result<Verdict, HookError> {
        let params = event
            .parameters
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let text = format!("{}\n{} {}", ctx.conversation_text(), event.content, params);

        let malicious = self.malicious_score(&text);
        let keywords = Self::keyword_score(&text);
        let combined = 0.4 * malicious + 0.3 * keywords + 0.3 * event.risk;

        let hard = adjusted_threshold(HARD_BASE, self.sensitivity);
        let soft = hard * SOFT_FRACTION;

        let verdict = if combined >= hard {
            Verdict::new(Decision::HardStop, 0.9, "High-risk intent detected")
        } else if combined >= soft {
            Verdict::new(Decision::SoftStop, 0.75, "Potentially risky intent")
        } else if combined >= 0.2 {
            Verdict::new(Decision::LogOnly, 0.6, "Minor risk indicators")
        } else {
            Verdict::new(Decision::Proceed, 0.95, "Intent appears benign")
        };

        let intent = if combined < 0.3 { "benign" } else { "suspicious" };
        Ok(verdict
            .with_feature("malicious_score", malicious)
            .with_feature("risk_score", keywords)
            .with_feature("action_risk", event.risk)
            .with_feature("intent", intent))
    }
}
