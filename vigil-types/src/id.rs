//! Typed ID wrappers for run and ruleset identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up run IDs and ruleset IDs.
/// These are just strings underneath, with no format requirement. The
/// protocol doesn't care what your IDs look like, only that a run
/// keeps the same one for its whole lifetime.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(RunId, "Stable identifier for one goal-directed agent run.");
typed_id!(RulesetId, "Identifier for a named policy ruleset.");

impl RunId {
    /// Generate a fresh random run ID (`run-` prefixed UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("run-{}", uuid::Uuid::new_v4()))
    }
}
