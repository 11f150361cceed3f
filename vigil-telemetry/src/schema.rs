//! The safeguard event schema.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vigil_types::{Decision, EventKind, HookPoint, RunId, StepEvent, Verdict};

/// A single safeguard decision event.
///
/// Field ordering is not significant on the wire; unknown fields are
/// ignored on read. The three replay fields are emitted only when the
/// step event carried the corresponding payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Run the decision belongs to.
    pub run_id: RunId,
    /// Step index within the run.
    pub step: u64,
    /// ISO-8601 UTC wall-clock time with millisecond precision.
    pub timestamp: String,
    /// Which lifecycle point fired.
    pub hook_point: HookPoint,
    /// Name of the hook that decided.
    pub hook_name: String,
    /// The decision.
    pub decision: Decision,
    /// Hook confidence in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable explanation.
    pub reason: String,
    /// Signals that informed the decision.
    #[serde(default)]
    pub features: BTreeMap<String, serde_json::Value>,
    /// Hook evaluation wall time in milliseconds.
    pub latency_ms: f64,
    /// User input under judgment, for replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
    /// Tool call under judgment, for replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<String>,
    /// Tool result under judgment, for replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<String>,
}

impl TelemetryEvent {
    /// Record a verdict as an event, stamped with the current time.
    #[must_use]
    pub fn record(run_id: RunId, step: u64, hook_point: HookPoint, verdict: &Verdict) -> Self {
        Self {
            run_id,
            step,
            timestamp: now_rfc3339_millis(),
            hook_point,
            hook_name: verdict.hook_name.clone(),
            decision: verdict.decision,
            confidence: verdict.confidence,
            reason: verdict.reason.clone(),
            features: verdict.features.clone(),
            latency_ms: verdict.latency_ms,
            user_input: None,
            tool_call: None,
            tool_result: None,
        }
    }

    /// Attach the step event's payload to the matching replay field.
    #[must_use]
    pub fn with_replay(mut self, event: &StepEvent) -> Self {
        match event.kind {
            EventKind::UserInput => self.user_input = Some(event.content.clone()),
            EventKind::ToolCall => self.tool_call = Some(event.content.clone()),
            EventKind::ToolResult => self.tool_result = Some(event.content.clone()),
        }
        self
    }

    /// Serialize to one JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current UTC time as ISO-8601 with millisecond precision and a
/// trailing `Z`.
#[must_use]
pub(crate) fn now_rfc3339_millis() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
