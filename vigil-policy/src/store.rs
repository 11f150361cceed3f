//! Named ruleset registry.

use std::collections::HashMap;
use std::sync::Arc;

use vigil_types::RulesetId;

use crate::engine::PolicyEngine;

/// A registry of rulesets keyed by name, so distinct agents share rules.
///
/// Populated at startup, read-only thereafter, the same discipline as
/// hook registration.
#[derive(Debug, Default)]
pub struct PolicyStore {
    engines: HashMap<RulesetId, Arc<PolicyEngine>>,
}

impl PolicyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ruleset under a name, replacing any previous one.
    pub fn insert(&mut self, id: impl Into<RulesetId>, engine: PolicyEngine) {
        self.engines.insert(id.into(), Arc::new(engine));
    }

    /// Fetch a ruleset by name.
    #[must_use]
    pub fn get(&self, id: &RulesetId) -> Option<Arc<PolicyEngine>> {
        self.engines.get(id).cloned()
    }

    /// Names of all registered rulesets.
    pub fn names(&self) -> impl Iterator<Item = &RulesetId> {
        self.engines.keys()
    }
}
