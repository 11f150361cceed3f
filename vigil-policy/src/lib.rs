//! Declarative safety rules for the vigil runtime.
//!
//! Policies are data, not code: a prioritized list of rules loaded from
//! YAML (or built inline), each pairing a small condition expression with
//! a decision. The [`PolicyEngine`] evaluates the list against a feature
//! namespace and returns the verdict of the highest-priority matching
//! rule.
//!
//! The condition language is deliberately tiny: comparisons joined by
//! `and` / `or`, nothing else. It is a security boundary: conditions are
//! parsed by [`parse`] into a closed AST at load time, and anything
//! outside the grammar is rejected there, not at evaluation time.
//!
//! ```yaml
//! rules:
//!   - name: high_drift_block
//!     when: drift_score > 0.5
//!     action: HARD_STOP
//!     reason: "Trajectory drift beyond safety threshold"
//!     priority: 10
//! ```

#![deny(missing_docs)]

mod engine;
mod hook;
mod parse;
mod store;

pub use engine::{
    PolicyEngine, PolicyError, PolicyRule, PolicySource, RuleSpec, default_policy,
    default_policy_specs,
};
pub use hook::PolicyHook;
pub use parse::{Condition, ParseError, parse};
pub use store::PolicyStore;
