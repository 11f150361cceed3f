//! Per-run rollup of emitted events.

use serde::{Deserialize, Serialize};

use vigil_types::Decision;

use crate::schema::TelemetryEvent;

/// Summary of all safeguard events in a single run.
///
/// A quick filter for downstream consumers: the decision counts equal the
/// literal counts in the event stream, `max_drift` is the largest
/// `drift_score` feature observed, and `total_violations` is the largest
/// cumulative `violation_count` feature observed (the counter is
/// monotonic, so its maximum is the run total).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// The run this summarizes.
    pub run_id: String,
    /// Timestamp of the first event.
    pub start_time: String,
    /// Timestamp of the last event.
    pub end_time: String,
    /// Total events emitted.
    pub total_events: u64,
    /// Count of PROCEED decisions.
    pub proceed_count: u64,
    /// Count of LOG_ONLY decisions.
    pub log_only_count: u64,
    /// Count of SOFT_STOP decisions.
    pub soft_stop_count: u64,
    /// Count of HUMAN_REVIEW decisions.
    pub human_review_count: u64,
    /// Count of HARD_STOP decisions.
    pub hard_stop_count: u64,
    /// Maximum drift observed across the run.
    pub max_drift: f64,
    /// Total policy violations across the run.
    pub total_violations: u64,
    /// Mean hook latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Decision of the last event.
    pub final_decision: Decision,
    /// True iff any HARD_STOP or HUMAN_REVIEW occurred.
    pub escalation_triggered: bool,
}

impl RunSummary {
    /// Derive a summary from a run's event stream, in emission order.
    ///
    /// Returns `None` for an empty stream; a run with no events has
    /// nothing to summarize.
    #[must_use]
    pub fn from_events(events: &[TelemetryEvent]) -> Option<Self> {
        let first = events.first()?;
        let last = events.last()?;

        let mut counts = [0u64; 5];
        let mut max_drift = 0.0f64;
        let mut total_violations = 0u64;
        let mut latency_sum = 0.0f64;
        for event in events {
            counts[event.decision.priority() as usize] += 1;
            if let Some(drift) = feature_f64(event, "drift_score") {
                max_drift = max_drift.max(drift);
            }
            if let Some(violations) = feature_u64(event, "violation_count") {
                total_violations = total_violations.max(violations);
            }
            latency_sum += event.latency_ms;
        }

        Some(Self {
            run_id: first.run_id.as_str().to_owned(),
            start_time: first.timestamp.clone(),
            end_time: last.timestamp.clone(),
            total_events: events.len() as u64,
            proceed_count: counts[Decision::Proceed.priority() as usize],
            log_only_count: counts[Decision::LogOnly.priority() as usize],
            soft_stop_count: counts[Decision::SoftStop.priority() as usize],
            human_review_count: counts[Decision::HumanReview.priority() as usize],
            hard_stop_count: counts[Decision::HardStop.priority() as usize],
            max_drift,
            total_violations,
            avg_latency_ms: latency_sum / events.len() as f64,
            final_decision: last.decision,
            escalation_triggered: events
                .iter()
                .any(|e| matches!(e.decision, Decision::HardStop | Decision::HumanReview)),
        })
    }
}

fn feature_f64(event: &TelemetryEvent, key: &str) -> Option<f64> {
    event.features.get(key)?.as_f64()
}

fn feature_u64(event: &TelemetryEvent, key: &str) -> Option<u64> {
    event.features.get(key)?.as_u64()
}
