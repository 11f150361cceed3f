//! Error types shared across the protocol boundary.

use thiserror::Error;

/// Hook evaluation errors. These are converted to verdicts by the
/// orchestrator, never propagated to the agent loop.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook's evaluation logic failed.
    #[error("hook failed: {0}")]
    Failed(String),

    /// The hook exceeded the caller-supplied timeout.
    #[error("hook timed out after {0} ms")]
    TimedOut(u64),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
