//! Decisions and the verdict record every hook produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What a safeguard decided about the current step.
///
/// The variant order is the aggregation priority order and is fixed:
/// `Proceed` (0) < `LogOnly` (1) < `SoftStop` (2) < `HumanReview` (3) <
/// `HardStop` (4). The derived `Ord` follows it, so "most restrictive"
/// is simply `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Allow the step to continue.
    Proceed,
    /// Record the signal but don't intervene.
    LogOnly,
    /// Pause and ask for clarification.
    SoftStop,
    /// Escalate to a human reviewer.
    HumanReview,
    /// Block the step.
    HardStop,
}

impl Decision {
    /// Aggregation priority. Higher wins.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Proceed => 0,
            Self::LogOnly => 1,
            Self::SoftStop => 2,
            Self::HumanReview => 3,
            Self::HardStop => 4,
        }
    }

    /// Wire name, as it appears in telemetry and policy files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proceed => "PROCEED",
            Self::LogOnly => "LOG_ONLY",
            Self::SoftStop => "SOFT_STOP",
            Self::HumanReview => "HUMAN_REVIEW",
            Self::HardStop => "HARD_STOP",
        }
    }

    /// Whether this decision blocks the step outright.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::HardStop)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision record produced by one hook invocation (or by
/// aggregating several).
///
/// `features` is a flat name → value map of the signals that informed the
/// decision; downstream policy rules match against it. `latency_ms` and
/// `hook_name` are stamped by the orchestrator after `evaluate` returns;
/// hooks don't need to fill them in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// The decision.
    pub decision: Decision,
    /// How confident the hook is, in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable explanation.
    pub reason: String,
    /// Signals that informed the decision.
    #[serde(default)]
    pub features: BTreeMap<String, serde_json::Value>,
    /// Evaluation wall time in milliseconds.
    #[serde(default)]
    pub latency_ms: f64,
    /// Name of the originating hook (comma-joined after aggregation).
    #[serde(default)]
    pub hook_name: String,
}

impl Verdict {
    /// Create a verdict. Confidence is clamped to `[0, 1]`.
    pub fn new(decision: Decision, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            decision,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            features: BTreeMap::new(),
            latency_ms: 0.0,
            hook_name: String::new(),
        }
    }

    /// Shorthand for a full-confidence `Proceed`.
    pub fn proceed(reason: impl Into<String>) -> Self {
        Self::new(Decision::Proceed, 1.0, reason)
    }

    /// Attach one feature.
    #[must_use]
    pub fn with_feature(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.features.insert(key.into(), value.into());
        self
    }

    /// Attach a batch of features.
    #[must_use]
    pub fn with_features(
        mut self,
        features: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Self {
        self.features.extend(features);
        self
    }

    /// Returns `true` if the decision is [`Decision::HardStop`].
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.decision.is_blocking()
    }

    /// Returns `true` if the decision is [`Decision::SoftStop`].
    #[must_use]
    pub fn is_soft_stop(&self) -> bool {
        self.decision == Decision::SoftStop
    }
}
