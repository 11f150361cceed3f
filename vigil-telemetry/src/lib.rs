//! Telemetry for safeguard decisions: the wire contract between the
//! runtime (producer) and downstream analyzers (consumers).
//!
//! This crate records events; it does not analyze them. One
//! [`TelemetryEvent`] is emitted per hook invocation, appended as
//! newline-delimited JSON by [`JsonlSink`] (or captured in memory by
//! [`MemorySink`]). [`RunSummary`] is the only derived record offered
//! here: a quick per-run rollup for filtering before full analysis.
//!
//! Events for a single run are totally ordered by `(step, emission
//! order)` and `step` is nondecreasing. Consumers must tolerate unknown
//! fields, because the schema only grows.

#![deny(missing_docs)]

mod schema;
mod sink;
mod summary;

pub use schema::TelemetryEvent;
pub use sink::{JsonlSink, MemorySink, TelemetryError, TelemetrySink};
pub use summary::RunSummary;
