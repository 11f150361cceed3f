//! Adapter that wraps a [`PolicyEngine`] as an ordinary [`GuardHook`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use vigil_types::{GuardHook, HookError, HookPoint, RunContext, StepEvent, Verdict};

use crate::engine::PolicyEngine;

/// A hook that evaluates a policy ruleset at one lifecycle point.
///
/// The engine's namespace is derived from what the hook can see on its
/// own: the context counters (seeded by the engine), the event's risk tag
/// (`tool_risk`), its numeric risk (`event_risk`), and any scalar context
/// metadata entries (so callers can surface planner `uncertainty` and the
/// like). Hooks cannot see each other's features; to evaluate rules over
/// the full per-step feature union, attach the engine to the runtime
/// instead.
pub struct PolicyHook {
    name: String,
    point: HookPoint,
    engine: Arc<PolicyEngine>,
}

impl PolicyHook {
    /// Wrap an engine as a hook at the given point.
    pub fn new(name: impl Into<String>, point: HookPoint, engine: PolicyEngine) -> Self {
        Self {
            name: name.into(),
            point,
            engine: Arc::new(engine),
        }
    }

    fn namespace(ctx: &RunContext, event: &StepEvent) -> BTreeMap<String, serde_json::Value> {
        let mut features = BTreeMap::new();
        features.insert("tool_risk".into(), serde_json::json!(event.risk_tag()));
        features.insert("event_risk".into(), serde_json::json!(event.risk));
        for (key, value) in &ctx.metadata {
            if value.is_number() || value.is_string() || value.is_boolean() {
                features.insert(key.clone(), value.clone());
            }
        }
        features
    }
}

#[async_trait]
impl GuardHook for PolicyHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn hook_point(&self) -> HookPoint {
        self.point
    }

    async fn evaluate(&self, ctx: &RunContext, event: &StepEvent) -> Result<Verdict, HookError> {
        Ok(self.engine.evaluate(ctx, &Self::namespace(ctx, event)))
    }
}
