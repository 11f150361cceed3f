//! The step event hooks are asked to judge.

use serde::{Deserialize, Serialize};

/// What kind of payload a step event carries.
///
/// The kind fixes which hook point is legal for the event: user input is
/// judged at `pre_action`, tool calls at `mid_step`, tool results at
/// `post_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Raw user input entering the loop.
    UserInput,
    /// A tool the agent is about to invoke (or just invoked).
    ToolCall,
    /// The observed result of a completed tool call.
    ToolResult,
}

/// One step event. Created once per step by the caller; read-only to hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    /// Payload kind.
    pub kind: EventKind,
    /// Raw content: the user text, the action description, or the tool
    /// output, depending on `kind`.
    pub content: String,
    /// Tool name, for tool calls and results.
    pub tool_name: Option<String>,
    /// Tool parameters or result attributes (e.g. a `status` field).
    pub parameters: Option<serde_json::Value>,
    /// Declared risk of the step in `[0, 1]`.
    pub risk: f64,
}

impl StepEvent {
    /// A user-input event.
    pub fn user_input(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::UserInput,
            content: content.into(),
            tool_name: None,
            parameters: None,
            risk: 0.0,
        }
    }

    /// A tool-call event.
    pub fn tool_call(tool: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: EventKind::ToolCall,
            content: description.into(),
            tool_name: Some(tool.into()),
            parameters: None,
            risk: 0.0,
        }
    }

    /// A tool-result event.
    pub fn tool_result(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind: EventKind::ToolResult,
            content: output.into(),
            tool_name: Some(tool.into()),
            parameters: None,
            risk: 0.0,
        }
    }

    /// Set the declared risk (clamped to `[0, 1]`).
    #[must_use]
    pub fn with_risk(mut self, risk: f64) -> Self {
        self.risk = risk.clamp(0.0, 1.0);
        self
    }

    /// Attach parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Coarse risk tag derived from the declared risk, the form policy
    /// rules match against (`tool_risk == "high"`).
    #[must_use]
    pub fn risk_tag(&self) -> &'static str {
        if self.risk >= 0.7 {
            "high"
        } else if self.risk >= 0.4 {
            "medium"
        } else {
            "low"
        }
    }

    /// The `status` string from the parameters, if present. Tool results
    /// carry `"ok"`, `"error"`, or `"blocked"` here.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.parameters.as_ref()?.get("status")?.as_str()
    }
}
