//! Hook registration, keyed by lifecycle point.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use vigil_types::{GuardHook, HookPoint};

/// Registration errors. Fatal at startup, never produced while running.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A hook with this name is already registered (at any point).
    #[error("duplicate hook name: {0}")]
    DuplicateHook(String),
}

/// Maps each lifecycle point to its ordered list of hooks.
///
/// Registration order is preserved per point and governs aggregation
/// tie-breaking. Names are unique across the whole registry, not just
/// within one point.
#[derive(Default)]
pub struct HookRegistry {
    by_point: HashMap<HookPoint, Vec<Arc<dyn GuardHook>>>,
    names: HashSet<String>,
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook at its declared point.
    pub fn register(&mut self, hook: Arc<dyn GuardHook>) -> Result<(), RegistryError> {
        let name = hook.name().to_owned();
        if !self.names.insert(name.clone()) {
            return Err(RegistryError::DuplicateHook(name));
        }
        self.by_point.entry(hook.hook_point()).or_default().push(hook);
        Ok(())
    }

    /// The hooks registered at a point, in registration order.
    #[must_use]
    pub fn hooks_at(&self, point: HookPoint) -> &[Arc<dyn GuardHook>] {
        self.by_point.get(&point).map_or(&[], Vec::as_slice)
    }

    /// All registered hooks across every point.
    pub fn all_hooks(&self) -> impl Iterator<Item = &Arc<dyn GuardHook>> {
        HookPoint::ALL
            .iter()
            .flat_map(|point| self.hooks_at(*point).iter())
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vigil_types::{HookError, RunContext, StepEvent, Verdict};

    struct Named(&'static str, HookPoint);

    #[async_trait]
    impl GuardHook for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn hook_point(&self) -> HookPoint {
            self.1
        }
        async fn evaluate(&self, _: &RunContext, _: &StepEvent) -> Result<Verdict, HookError> {
            Ok(Verdict::proceed("ok"))
        }
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut registry = HookRegistry::new();
        registry
            .register(Arc::new(Named("first", HookPoint::PreAction)))
            .unwrap();
        registry
            .register(Arc::new(Named("second", HookPoint::PreAction)))
            .unwrap();

        let names: Vec<&str> = registry
            .hooks_at(HookPoint::PreAction)
            .iter()
            .map(|hook| hook.name())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn duplicate_names_are_rejected_across_points() {
        let mut registry = HookRegistry::new();
        registry
            .register(Arc::new(Named("monitor", HookPoint::PreAction)))
            .unwrap();
        let result = registry.register(Arc::new(Named("monitor", HookPoint::PostAction)));
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateHook(ref name)) if name == "monitor"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregistered_points_are_empty() {
        let registry = HookRegistry::new();
        assert!(registry.hooks_at(HookPoint::MidStep).is_empty());
        assert!(registry.is_empty());
    }
}
