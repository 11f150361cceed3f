//! Prompt-injection detection.

use async_trait::async_trait;
use regex::Regex;

use vigil_types::{Decision, GuardHook, HookError, HookPoint, RunContext, StepEvent, Verdict};

const INJECTION_PATTERNS: &[&str] = &[
    r"ignore\s+(all\s+)?(previous|prior)\s+instructions",
    r"new\s+instructions?\s*:",
    r"system\s*prompt\s*:",
    r"---\s*end\s*(of\s*)?(text|input)",
    r"admin(istrator)?\s+override",
];

/// Detects prompt-injection attempts in the conversation before an action
/// is taken. Any pattern match blocks the step; injection is not a
/// graded signal.
pub struct InjectionDetector {
    patterns: Vec<Regex>,
}

impl InjectionDetector {
    /// Create a detector with the built-in pattern list.
    #[must_use]
    pub fn new() -> Self {
        let patterns = INJECTION_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
            .collect();
        Self { patterns }
    }

    /// Add a custom pattern to match against the conversation.
    #[must_use]
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.patterns.push(pattern);
        self
    }
}

impl Default for InjectionDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuardHook for InjectionDetector {
    fn name(&self) -> &str {
        "injection_detector"
    }

    fn hook_point(&self) -> HookPoint {
        HookPoint::PreAction
    }

    async fn evaluate(&self, ctx: &RunContext, event: &StepEvent) -> Result<Verdict, HookError> {
        let text = format!("{}\n{}", ctx.conversation_text(), event.content);

        let matched: Vec<String> = self
            .patterns
            .iter()
            .filter(|p| p.is_match(&text))
            .map(|p| p.as_str().to_owned())
            .collect();

        if matched.is_empty() {
            return Ok(Verdict::new(Decision::Proceed, 0.95, "No injection detected"));
        }

        let score = (matched.len() as f64 / 2.0).min(1.0);
        Ok(
            Verdict::new(Decision::HardStop, 0.9, "Injection attempt detected")
                .with_feature("injection_score", score)
                .with_feature("patterns_matched", serde_json::json!(matched)),
        )
    }
}
