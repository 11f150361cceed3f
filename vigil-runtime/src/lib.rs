//! The vigil safeguard runtime: hook orchestration around one step event.
//!
//! [`SafeguardRuntime`] holds the hook registry, an optional policy
//! engine, and the telemetry sink. One call to
//! [`step`](SafeguardRuntime::step) dispatches every hook registered at a
//! lifecycle point in registration order, times each invocation, emits one
//! telemetry event per invocation, and returns a single aggregated
//! verdict under the fixed most-restrictive rule.
//!
//! ## Guarantees
//!
//! - Aggregation is deterministic and independent of hook order: the
//!   highest-priority decision wins, ties go to the earliest-registered
//!   contributor.
//! - A failing or timed-out hook never blocks the step by itself; it is
//!   converted to a `LOG_ONLY` verdict (or `HARD_STOP` under fail-closed
//!   configuration) and dispatch continues.
//! - The registry and any loaded policy are read-only after startup; one
//!   run processes one step at a time, so context mutation happens only
//!   between passes. Independent runs may share a runtime concurrently.
//!
//! [`Composer`] layers multiple hook-point passes into named defense
//! strategies with pluggable cross-layer aggregation.

#![deny(missing_docs)]

mod compose;
mod config;
mod registry;
mod runtime;

pub use compose::{AggregationRule, ComposedOutcome, Composer, Strategy};
pub use config::RuntimeConfig;
pub use registry::{HookRegistry, RegistryError};
pub use runtime::{SafeguardRuntime, aggregate_verdicts};
