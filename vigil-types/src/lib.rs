//! # vigil-types — Protocol types for the vigil safeguard runtime
//!
//! This crate defines the data model and the one trait boundary that every
//! other vigil crate builds on.
//!
//! | Interface | Types | What it does |
//! |-----------|-------|-------------|
//! | Context | [`RunContext`], [`Turn`] | Per-run state visible to hooks |
//! | Events | [`StepEvent`], [`EventKind`] | The step being judged |
//! | Verdicts | [`Verdict`], [`Decision`] | What a hook decided, and why |
//! | Hooks | [`GuardHook`], [`HookPoint`] | Pluggable detection logic |
//!
//! ## Design Principle
//!
//! Hooks observe and decide; they never mutate. [`RunContext`] is owned by
//! the orchestrator and changes only between hook dispatches, so every hook
//! in a pass sees the same snapshot. A [`Verdict`] is a value, not an
//! effect: blocking, pausing, and escalation all happen in the caller.
//!
//! ## Dependency Notes
//!
//! Free-form data (verdict features, context metadata, tool parameters) is
//! `serde_json::Value`. JSON is the interchange format for agent telemetry
//! and the downstream analyzers consume it directly; a generic
//! `T: Serialize` would complicate trait-object safety for no practical
//! benefit.

#![deny(missing_docs)]

pub mod context;
pub mod error;
pub mod event;
pub mod hook;
pub mod id;
pub mod verdict;

// Re-exports for convenience
pub use context::{RunContext, Turn, TurnRole};
pub use error::HookError;
pub use event::{EventKind, StepEvent};
pub use hook::{GuardHook, HookPoint};
pub use id::{RulesetId, RunId};
pub use verdict::{Decision, Verdict};
