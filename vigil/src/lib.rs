#![deny(missing_docs)]
//! # vigil — umbrella crate
//!
//! Single import surface for the vigil safeguard runtime. Re-exports the
//! protocol types, the orchestrator, and the supporting crates behind
//! feature flags, plus a `prelude` for the happy path.

#[cfg(feature = "escalation")]
pub use vigil_escalation;
#[cfg(feature = "detect")]
pub use vigil_hook_detect;
#[cfg(feature = "policy")]
pub use vigil_policy;
#[cfg(feature = "core")]
pub use vigil_runtime;
#[cfg(feature = "core")]
pub use vigil_telemetry;
#[cfg(feature = "core")]
pub use vigil_types;

/// Happy-path imports for composing a guarded agent loop.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use vigil_types::{
        Decision, EventKind, GuardHook, HookError, HookPoint, RunContext, RunId, StepEvent, Turn,
        TurnRole, Verdict,
    };

    #[cfg(feature = "core")]
    pub use vigil_runtime::{
        AggregationRule, Composer, RuntimeConfig, SafeguardRuntime, Strategy,
    };

    #[cfg(feature = "core")]
    pub use vigil_telemetry::{JsonlSink, MemorySink, RunSummary, TelemetryEvent, TelemetrySink};

    #[cfg(feature = "policy")]
    pub use vigil_policy::{
        PolicyEngine, PolicyHook, PolicySource, RuleSpec, default_policy, default_policy_specs,
    };

    #[cfg(feature = "escalation")]
    pub use vigil_escalation::{
        EscalationLevel, EscalationOutcome, EscalationPolicy, EscalationSignals,
    };

    #[cfg(feature = "detect")]
    pub use vigil_hook_detect::{
        DriftMonitor, InjectionDetector, IntentClassifier, OutcomeVerifier, ViolationMonitor,
    };
}
