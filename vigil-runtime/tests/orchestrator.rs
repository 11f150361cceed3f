use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use vigil_policy::{PolicySource, RuleSpec};
use vigil_runtime::{RuntimeConfig, SafeguardRuntime};
use vigil_telemetry::{MemorySink, TelemetryError, TelemetrySink};
use vigil_types::{
    Decision, GuardHook, HookError, HookPoint, RunContext, StepEvent, Verdict,
};

/// A hook that returns a fixed verdict.
struct FixedHook {
    name: &'static str,
    point: HookPoint,
    decision: Decision,
    confidence: f64,
    features: Vec<(&'static str, serde_json::Value)>,
}

impl FixedHook {
    fn new(name: &'static str, point: HookPoint, decision: Decision) -> Self {
        Self {
            name,
            point,
            decision,
            confidence: 0.9,
            features: Vec::new(),
        }
    }

    fn with_feature(mut self, key: &'static str, value: serde_json::Value) -> Self {
        self.features.push((key, value));
        self
    }
}

#[async_trait]
impl GuardHook for FixedHook {
    fn name(&self) -> &str {
        self.name
    }
    fn hook_point(&self) -> HookPoint {
        self.point
    }
    async fn evaluate(&self, _: &RunContext, _: &StepEvent) -> Result<Verdict, HookError> {
        let mut verdict = Verdict::new(self.decision, self.confidence, format!("{} fired", self.name));
        for (key, value) in &self.features {
            verdict.features.insert((*key).to_owned(), value.clone());
        }
        Ok(verdict)
    }
}

/// A hook that always errors.
struct FailingHook;

#[async_trait]
impl GuardHook for FailingHook {
    fn name(&self) -> &str {
        "failing_hook"
    }
    fn hook_point(&self) -> HookPoint {
        HookPoint::PreAction
    }
    async fn evaluate(&self, _: &RunContext, _: &StepEvent) -> Result<Verdict, HookError> {
        Err(HookError::Failed("something broke".into()))
    }
}

/// A hook that sleeps past any reasonable timeout.
struct SlowHook;

#[async_trait]
impl GuardHook for SlowHook {
    fn name(&self) -> &str {
        "slow_hook"
    }
    fn hook_point(&self) -> HookPoint {
        HookPoint::PreAction
    }
    async fn evaluate(&self, _: &RunContext, _: &StepEvent) -> Result<Verdict, HookError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Verdict::proceed("too late"))
    }
}

fn ctx() -> RunContext {
    RunContext::new("run-orch")
}

// --- Empty registry ---

#[tokio::test]
async fn empty_point_proceeds_without_telemetry() {
    let mut runtime = SafeguardRuntime::default();
    let sink = Arc::new(MemorySink::new());
    runtime.set_telemetry_sink(sink.clone());

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    assert_eq!(verdict.decision, Decision::Proceed);
    assert_eq!(verdict.confidence, 1.0);
    assert_eq!(verdict.reason, "no hooks registered");
    assert!(sink.events().is_empty());
}

// --- Aggregation ---

#[tokio::test]
async fn most_restrictive_decision_wins() {
    let mut runtime = SafeguardRuntime::default();
    runtime
        .register(Arc::new(FixedHook::new("a", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();
    runtime
        .register(Arc::new(FixedHook::new("b", HookPoint::PreAction, Decision::HardStop)))
        .unwrap();
    runtime
        .register(Arc::new(FixedHook::new("c", HookPoint::PreAction, Decision::SoftStop)))
        .unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    assert_eq!(verdict.decision, Decision::HardStop);
    assert_eq!(verdict.reason, "b fired");
    assert_eq!(verdict.hook_name, "a,b,c");
}

#[tokio::test]
async fn ties_go_to_the_first_registered_hook() {
    let mut runtime = SafeguardRuntime::default();
    let mut first = FixedHook::new("first", HookPoint::PreAction, Decision::SoftStop);
    first.confidence = 0.4;
    let mut second = FixedHook::new("second", HookPoint::PreAction, Decision::SoftStop);
    second.confidence = 0.99;
    runtime.register(Arc::new(first)).unwrap();
    runtime.register(Arc::new(second)).unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    assert_eq!(verdict.reason, "first fired");
    assert_eq!(verdict.confidence, 0.4);
}

#[tokio::test]
async fn features_union_with_later_overwriting() {
    let mut runtime = SafeguardRuntime::default();
    runtime
        .register(Arc::new(
            FixedHook::new("a", HookPoint::MidStep, Decision::Proceed)
                .with_feature("drift_score", serde_json::json!(0.1))
                .with_feature("only_a", serde_json::json!(true)),
        ))
        .unwrap();
    runtime
        .register(Arc::new(
            FixedHook::new("b", HookPoint::MidStep, Decision::Proceed)
                .with_feature("drift_score", serde_json::json!(0.9)),
        ))
        .unwrap();

    let verdict = runtime
        .step(HookPoint::MidStep, &ctx(), &StepEvent::user_input("hi"))
        .await;

    // Later contributor overwrites earlier on collision.
    assert_eq!(verdict.features["drift_score"], serde_json::json!(0.9));
    assert_eq!(verdict.features["only_a"], serde_json::json!(true));
}

#[tokio::test]
async fn latency_is_the_sum_of_hook_latencies() {
    let mut runtime = SafeguardRuntime::default();
    runtime
        .register(Arc::new(FixedHook::new("a", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();
    runtime
        .register(Arc::new(FixedHook::new("b", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();
    let sink = Arc::new(MemorySink::new());
    runtime.set_telemetry_sink(sink.clone());

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    let individual: f64 = sink.events().iter().map(|e| e.latency_ms).sum();
    assert!((verdict.latency_ms - individual).abs() < 1e-9);
}

// --- Determinism ---

#[tokio::test]
async fn repeated_steps_agree() {
    let mut runtime = SafeguardRuntime::default();
    runtime
        .register(Arc::new(
            FixedHook::new("a", HookPoint::PreAction, Decision::SoftStop)
                .with_feature("x", serde_json::json!(1)),
        ))
        .unwrap();
    runtime
        .register(Arc::new(FixedHook::new("b", HookPoint::PreAction, Decision::LogOnly)))
        .unwrap();

    let context = ctx();
    let event = StepEvent::user_input("hi");
    let first = runtime.step(HookPoint::PreAction, &context, &event).await;
    let second = runtime.step(HookPoint::PreAction, &context, &event).await;

    assert_eq!(first.decision, second.decision);
    assert_eq!(first.reason, second.reason);
    assert_eq!(first.features, second.features);
    assert_eq!(first.hook_name, second.hook_name);
}

// --- Hook failure ---

#[tokio::test]
async fn hook_failure_fails_open_and_continues() {
    let mut runtime = SafeguardRuntime::default();
    let sink = Arc::new(MemorySink::new());
    runtime.set_telemetry_sink(sink.clone());
    runtime.register(Arc::new(FailingHook)).unwrap();
    runtime
        .register(Arc::new(FixedHook::new("ok", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    // The failure is telemetry-only under fail-open: the healthy hook's
    // PROCEED stands as the aggregate.
    assert_eq!(verdict.decision, Decision::Proceed);
    assert_eq!(verdict.hook_name, "ok");

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].decision, Decision::LogOnly);
    assert_eq!(events[0].confidence, 0.0);
    assert!(events[0].reason.starts_with("hook failed: "));
    assert_eq!(events[1].decision, Decision::Proceed);
}

#[tokio::test]
async fn all_hooks_failing_never_blocks() {
    let mut runtime = SafeguardRuntime::default();
    runtime.register(Arc::new(FailingHook)).unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    assert!(matches!(
        verdict.decision,
        Decision::Proceed | Decision::LogOnly
    ));
}

#[tokio::test]
async fn fail_closed_converts_failures_to_hard_stop() {
    let mut runtime = SafeguardRuntime::new(RuntimeConfig::new().fail_closed());
    runtime.register(Arc::new(FailingHook)).unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    assert_eq!(verdict.decision, Decision::HardStop);
    assert!(verdict.reason.starts_with("hook failed: "));
}

#[tokio::test]
async fn timed_out_hook_is_a_failure() {
    let config = RuntimeConfig::new().with_hook_timeout(Duration::from_millis(20));
    let mut runtime = SafeguardRuntime::new(config);
    runtime.register(Arc::new(SlowHook)).unwrap();
    runtime
        .register(Arc::new(FixedHook::new("ok", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    // The timed-out hook is a fail-open failure; the hook after it still
    // ran and carries the pass.
    assert_eq!(verdict.decision, Decision::Proceed);
    assert_eq!(verdict.hook_name, "ok");
}

// --- Policy attachment ---

#[tokio::test]
async fn policy_sees_hook_features_and_contradicts_them() {
    let mut runtime = SafeguardRuntime::default();
    runtime
        .register(Arc::new(
            FixedHook::new("drift", HookPoint::MidStep, Decision::Proceed)
                .with_feature("drift_score", serde_json::json!(0.6)),
        ))
        .unwrap();
    runtime
        .load_policy(PolicySource::Inline(vec![RuleSpec {
            name: "high_drift_block".into(),
            when: "drift_score > 0.5".into(),
            action: Decision::HardStop,
            reason: "Trajectory drift beyond safety threshold".into(),
            priority: 10,
        }]))
        .unwrap();

    let verdict = runtime
        .step(HookPoint::MidStep, &ctx(), &StepEvent::user_input("hi"))
        .await;

    // The hook said PROCEED; the policy rule fires on the hook's own
    // feature and the most restrictive decision wins.
    assert_eq!(verdict.decision, Decision::HardStop);
    assert_eq!(verdict.hook_name, "drift,policy_engine");
    assert_eq!(
        verdict.features["matched_rule"],
        serde_json::json!("high_drift_block")
    );
}

#[tokio::test]
async fn policy_alone_still_evaluates() {
    let mut runtime = SafeguardRuntime::default();
    runtime
        .load_policy(PolicySource::Inline(vec![RuleSpec {
            name: "step_cap".into(),
            when: "step >= 5".into(),
            action: Decision::SoftStop,
            reason: "too many steps".into(),
            priority: 1,
        }]))
        .unwrap();

    let mut context = ctx();
    for _ in 0..5 {
        context.advance_step();
    }
    let verdict = runtime
        .step(HookPoint::PreAction, &context, &StepEvent::user_input("hi"))
        .await;
    assert_eq!(verdict.decision, Decision::SoftStop);
    assert_eq!(verdict.hook_name, "policy_engine");
}

// --- Telemetry ---

#[tokio::test]
async fn telemetry_is_ordered_and_step_monotonic() {
    let mut runtime = SafeguardRuntime::default();
    let sink = Arc::new(MemorySink::new());
    runtime.set_telemetry_sink(sink.clone());
    runtime
        .register(Arc::new(FixedHook::new("a", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();
    runtime
        .register(Arc::new(FixedHook::new("b", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();

    let mut context = ctx();
    let event = StepEvent::user_input("hi");
    for _ in 0..3 {
        runtime.step(HookPoint::PreAction, &context, &event).await;
        context.advance_step();
    }

    let events = sink.events();
    assert_eq!(events.len(), 6);
    let mut last_step = 0;
    for event in &events {
        assert!(event.step >= last_step, "step went backwards");
        last_step = event.step;
    }
    // Within a step, hooks appear in registration order.
    assert_eq!(events[0].hook_name, "a");
    assert_eq!(events[1].hook_name, "b");
}

#[tokio::test]
async fn replay_payload_matches_event_kind() {
    let mut runtime = SafeguardRuntime::default();
    let sink = Arc::new(MemorySink::new());
    runtime.set_telemetry_sink(sink.clone());
    runtime
        .register(Arc::new(FixedHook::new("a", HookPoint::PostAction, Decision::Proceed)))
        .unwrap();

    let event = StepEvent::tool_result("shell", "exit 0");
    runtime.step(HookPoint::PostAction, &ctx(), &event).await;

    let events = sink.events();
    assert_eq!(events[0].tool_result.as_deref(), Some("exit 0"));
    assert!(events[0].user_input.is_none());
    assert_eq!(events[0].hook_point, HookPoint::PostAction);
}

/// A sink that fails a configurable number of times before accepting.
struct FlakySink {
    failures_left: AtomicUsize,
    inner: MemorySink,
}

impl TelemetrySink for FlakySink {
    fn emit(&self, event: &vigil_telemetry::TelemetryEvent) -> Result<(), TelemetryError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TelemetryError::Io(std::io::Error::other("sink down")));
        }
        self.inner.emit(event)
    }
}

#[tokio::test]
async fn sink_errors_are_retried_once_then_swallowed() {
    let mut runtime = SafeguardRuntime::default();
    let sink = Arc::new(FlakySink {
        failures_left: AtomicUsize::new(1),
        inner: MemorySink::new(),
    });
    runtime.set_telemetry_sink(sink.clone());
    runtime
        .register(Arc::new(FixedHook::new("a", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();

    // First emission fails once, the retry lands; the step never errors.
    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;
    assert_eq!(verdict.decision, Decision::Proceed);
    assert_eq!(sink.inner.events().len(), 1);
}

#[tokio::test]
async fn persistent_sink_failure_never_breaks_the_step() {
    let mut runtime = SafeguardRuntime::default();
    let sink = Arc::new(FlakySink {
        failures_left: AtomicUsize::new(usize::MAX),
        inner: MemorySink::new(),
    });
    runtime.set_telemetry_sink(sink.clone());
    runtime
        .register(Arc::new(FixedHook::new("a", HookPoint::PreAction, Decision::Proceed)))
        .unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;
    assert_eq!(verdict.decision, Decision::Proceed);
    assert!(sink.inner.events().is_empty());
}

// --- Cancellation ---

#[tokio::test]
async fn cancellation_skips_remaining_hooks() {
    let mut runtime = SafeguardRuntime::default();
    let sink = Arc::new(MemorySink::new());
    runtime.set_telemetry_sink(sink.clone());

    /// Cancels the runtime from inside the first hook.
    struct CancellingHook(tokio_util::sync::CancellationToken);

    #[async_trait]
    impl GuardHook for CancellingHook {
        fn name(&self) -> &str {
            "canceller"
        }
        fn hook_point(&self) -> HookPoint {
            HookPoint::PreAction
        }
        async fn evaluate(&self, _: &RunContext, _: &StepEvent) -> Result<Verdict, HookError> {
            self.0.cancel();
            Ok(Verdict::proceed("cancelled mid-step"))
        }
    }

    let token = runtime.cancellation_token();
    runtime.register(Arc::new(CancellingHook(token))).unwrap();
    runtime
        .register(Arc::new(FixedHook::new("after", HookPoint::PreAction, Decision::HardStop)))
        .unwrap();

    let verdict = runtime
        .step(HookPoint::PreAction, &ctx(), &StepEvent::user_input("hi"))
        .await;

    // The cancelling hook completed and its telemetry was emitted; the
    // hook after it never ran.
    assert_eq!(verdict.decision, Decision::Proceed);
    assert_eq!(verdict.hook_name, "canceller");
    assert_eq!(sink.events().len(), 1);
}

// --- Run lifecycle ---

#[tokio::test]
async fn run_lifecycle_reaches_every_hook() {
    struct CountingHook {
        starts: AtomicUsize,
        ends: AtomicUsize,
    }

    #[async_trait]
    impl GuardHook for CountingHook {
        fn name(&self) -> &str {
            "counting"
        }
        fn hook_point(&self) -> HookPoint {
            HookPoint::MidStep
        }
        async fn evaluate(&self, _: &RunContext, _: &StepEvent) -> Result<Verdict, HookError> {
            Ok(Verdict::proceed("ok"))
        }
        fn run_started(&self, _: &vigil_types::RunId) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn run_ended(&self, _: &vigil_types::RunId) {
            self.ends.fetch_add(1, Ordering::SeqCst);
        }
    }

    let hook = Arc::new(CountingHook {
        starts: AtomicUsize::new(0),
        ends: AtomicUsize::new(0),
    });
    let mut runtime = SafeguardRuntime::default();
    runtime.register(hook.clone()).unwrap();

    let context = ctx();
    runtime.run_started(&context.run_id);
    runtime.run_ended(&context.run_id);

    assert_eq!(hook.starts.load(Ordering::SeqCst), 1);
    assert_eq!(hook.ends.load(Ordering::SeqCst), 1);
}
