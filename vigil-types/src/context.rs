//! Per-run context visible to every hook.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::RunId;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// A human user.
    User,
    /// The agent.
    Assistant,
    /// A system message.
    System,
    /// A tool result fed back into the conversation.
    Tool,
}

/// One turn of the conversation under scrutiny.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it.
    pub role: TurnRole,
    /// What was said.
    pub content: String,
}

impl Turn {
    /// Create a turn.
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Per-run state tracked by the orchestrator and read by hooks.
///
/// Only the orchestrator (or the caller driving it) mutates a context, and
/// only **between** hook dispatches, never while a hook-point pass is in
/// flight. Hooks receive `&RunContext` and must treat it as a snapshot.
///
/// Invariants: `cumulative_drift >= 0`, `step` strictly increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Stable identifier for the run.
    pub run_id: RunId,
    /// Zero-based index of the current step.
    pub step: u64,
    /// Conversation so far, oldest first.
    pub conversation: Vec<Turn>,
    /// The goal the user stated at run start, if any.
    pub stated_goal: Option<String>,
    /// Drift accumulated across the run so far. Never negative.
    pub cumulative_drift: f64,
    /// Policy violations observed across the run so far.
    pub violation_count: u32,
    /// Free-form caller metadata (e.g. planner uncertainty).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RunContext {
    /// Create an empty context at step 0.
    pub fn new(run_id: impl Into<RunId>) -> Self {
        Self {
            run_id: run_id.into(),
            step: 0,
            conversation: Vec::new(),
            stated_goal: None,
            cumulative_drift: 0.0,
            violation_count: 0,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the stated goal.
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.stated_goal = Some(goal.into());
        self
    }

    /// Append a conversation turn. Call between steps only.
    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) {
        self.conversation.push(Turn::new(role, content));
    }

    /// Advance to the next step. Call between steps only.
    pub fn advance_step(&mut self) {
        self.step += 1;
    }

    /// Add drift observed this step. Negative deltas are ignored so the
    /// accumulator never goes below zero.
    pub fn record_drift(&mut self, delta: f64) {
        if delta > 0.0 {
            self.cumulative_drift += delta;
        }
    }

    /// Record one policy violation.
    pub fn record_violation(&mut self) {
        self.violation_count += 1;
    }

    /// Set a metadata entry.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// The whole conversation flattened to one newline-joined string, the
    /// form the keyword and pattern scanners work over.
    #[must_use]
    pub fn conversation_text(&self) -> String {
        let texts: Vec<&str> = self
            .conversation
            .iter()
            .map(|turn| turn.content.as_str())
            .collect();
        texts.join("\n")
    }
}
