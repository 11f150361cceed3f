//! The orchestrator.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use vigil_policy::{PolicyEngine, PolicyError, PolicySource};
use vigil_telemetry::{TelemetryEvent, TelemetrySink};
use vigil_types::{
    Decision, GuardHook, HookError, HookPoint, RunContext, RunId, StepEvent, Verdict,
};

use crate::config::RuntimeConfig;
use crate::registry::{HookRegistry, RegistryError};

/// Name under which the attached policy engine appears in telemetry.
const POLICY_HOOK_NAME: &str = "policy_engine";

/// The runtime orchestrator for safeguard hooks.
///
/// Register hooks and load policy at startup; afterwards the runtime is
/// read-only and [`step`](Self::step) may be called freely, including from
/// concurrent independent runs. The runtime orchestrates; hooks decide.
pub struct SafeguardRuntime {
    registry: HookRegistry,
    policy: Option<PolicyEngine>,
    sink: Option<Arc<dyn TelemetrySink>>,
    config: RuntimeConfig,
    cancel: CancellationToken,
}

impl SafeguardRuntime {
    /// Create a runtime with the given configuration.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            registry: HookRegistry::new(),
            policy: None,
            sink: None,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Register a hook. Duplicate names are rejected.
    pub fn register(&mut self, hook: Arc<dyn GuardHook>) -> Result<(), RegistryError> {
        self.registry.register(hook)
    }

    /// Install the telemetry sink, invoked once per hook verdict.
    pub fn set_telemetry_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sink = Some(sink);
    }

    /// Load or replace the policy ruleset. The engine runs as a terminal
    /// participant of every [`step`](Self::step) pass, evaluated over the
    /// union of the pass's hook features, and its verdict joins the
    /// aggregation like any hook's.
    pub fn load_policy(&mut self, source: PolicySource) -> Result<(), PolicyError> {
        self.policy = Some(PolicyEngine::load(source)?);
        Ok(())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// A token that cancels in-flight dispatch. Cancellation mid-step is
    /// advisory: the current hook completes and its telemetry is emitted,
    /// remaining hooks are skipped.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Notify every registered hook that a run is starting.
    pub fn run_started(&self, run_id: &RunId) {
        for hook in self.registry.all_hooks() {
            hook.run_started(run_id);
        }
    }

    /// Notify every registered hook that a run ended, releasing any
    /// per-run hook state.
    pub fn run_ended(&self, run_id: &RunId) {
        for hook in self.registry.all_hooks() {
            hook.run_ended(run_id);
        }
    }

    /// Run one hook-point pass and return the aggregated verdict.
    ///
    /// Hooks execute sequentially in registration order; each gets the
    /// same context snapshot. One telemetry event is emitted per
    /// invocation. With nothing registered at the point (and no policy
    /// loaded) the pass is a full-confidence `PROCEED` and emits nothing.
    ///
    /// Under fail-open configuration a failed hook is recorded in
    /// telemetry as `LOG_ONLY` but does not contribute to the aggregate:
    /// the pass behaves as if the hook weren't there. Only when every
    /// hook at the point failed does the aggregate itself degrade to
    /// `LOG_ONLY`. Fail-closed failures contribute as `HARD_STOP`.
    pub async fn step(&self, point: HookPoint, ctx: &RunContext, event: &StepEvent) -> Verdict {
        let hooks = self.registry.hooks_at(point);
        if hooks.is_empty() && self.policy.is_none() {
            return Verdict::proceed("no hooks registered");
        }

        let mut verdicts: Vec<Verdict> = Vec::with_capacity(hooks.len() + 1);
        let mut failures: Vec<Verdict> = Vec::new();
        for hook in hooks {
            if self.cancel.is_cancelled() {
                tracing::debug!(point = %point, run = %ctx.run_id, "vigil.step.cancelled");
                break;
            }
            let (verdict, failed) = self.invoke_hook(hook.as_ref(), ctx, event).await;
            tracing::debug!(
                hook = %verdict.hook_name,
                decision = %verdict.decision,
                point = %point,
                "vigil.hook.evaluated"
            );
            self.emit(point, ctx, event, &verdict);
            if failed && self.config.fail_open_on_hook_error {
                failures.push(verdict);
            } else {
                verdicts.push(verdict);
            }
        }

        if let Some(engine) = &self.policy
            && !self.cancel.is_cancelled()
        {
            let mut features = std::collections::BTreeMap::new();
            for verdict in &verdicts {
                features.extend(verdict.features.clone());
            }
            let start = Instant::now();
            let mut verdict = engine.evaluate(ctx, &features);
            verdict.latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            verdict.hook_name = POLICY_HOOK_NAME.to_owned();
            self.emit(point, ctx, event, &verdict);
            verdicts.push(verdict);
        }

        if verdicts.is_empty() && !failures.is_empty() {
            return aggregate_verdicts(&failures);
        }
        aggregate_verdicts(&verdicts)
    }

    async fn invoke_hook(
        &self,
        hook: &dyn GuardHook,
        ctx: &RunContext,
        event: &StepEvent,
    ) -> (Verdict, bool) {
        let start = Instant::now();
        let result = match self.config.hook_timeout {
            Some(limit) => match tokio::time::timeout(limit, hook.evaluate(ctx, event)).await {
                Ok(result) => result,
                Err(_) => Err(HookError::TimedOut(limit.as_millis() as u64)),
            },
            None => hook.evaluate(ctx, event).await,
        };
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let result = result.and_then(|verdict| {
            if verdict.confidence.is_finite() {
                Ok(verdict)
            } else {
                Err(HookError::Failed("invalid verdict: non-finite confidence".into()))
            }
        });

        let (mut verdict, failed) = match result {
            Ok(verdict) => (verdict, false),
            Err(error) => {
                tracing::warn!(hook = hook.name(), %error, "vigil.hook.failed");
                let decision = if self.config.fail_open_on_hook_error {
                    Decision::LogOnly
                } else {
                    Decision::HardStop
                };
                (
                    Verdict::new(decision, 0.0, format!("hook failed: {error}")),
                    true,
                )
            }
        };
        verdict.confidence = verdict.confidence.clamp(0.0, 1.0);
        verdict.latency_ms = latency_ms;
        verdict.hook_name = hook.name().to_owned();
        (verdict, failed)
    }

    /// Emit one telemetry event, retrying once. Sink errors never reach
    /// the agent loop.
    fn emit(&self, point: HookPoint, ctx: &RunContext, event: &StepEvent, verdict: &Verdict) {
        let Some(sink) = &self.sink else { return };
        let telemetry =
            TelemetryEvent::record(ctx.run_id.clone(), ctx.step, point, verdict).with_replay(event);
        if sink.emit(&telemetry).is_err()
            && let Err(error) = sink.emit(&telemetry)
        {
            tracing::warn!(%error, hook = %verdict.hook_name, "vigil.telemetry.dropped");
        }
    }
}

impl Default for SafeguardRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

/// Aggregate a pass's verdicts under the orchestrator's fixed rule.
///
/// The decision of maximum priority wins; ties go to the earliest
/// contributor. The result carries the union of all feature maps (later
/// contributors overwrite earlier on key collision, so avoid cross-hook
/// feature name collisions, or namespace your keys), the sum of
/// latencies, and the comma-joined contributor names in order. An empty
/// slice aggregates to a full-confidence `PROCEED`.
#[must_use]
pub fn aggregate_verdicts(verdicts: &[Verdict]) -> Verdict {
    let Some(first) = verdicts.first() else {
        return Verdict::proceed("no hooks registered");
    };

    let mut winner = first;
    for verdict in &verdicts[1..] {
        if verdict.decision.priority() > winner.decision.priority() {
            winner = verdict;
        }
    }

    let mut features = std::collections::BTreeMap::new();
    let mut names = Vec::with_capacity(verdicts.len());
    let mut latency_ms = 0.0;
    for verdict in verdicts {
        features.extend(verdict.features.clone());
        names.push(verdict.hook_name.as_str());
        latency_ms += verdict.latency_ms;
    }

    Verdict {
        decision: winner.decision,
        confidence: winner.confidence,
        reason: winner.reason.clone(),
        features,
        latency_ms,
        hook_name: names.join(","),
    }
}
