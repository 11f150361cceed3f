//! Append-only sinks for telemetry events.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;

use crate::schema::TelemetryEvent;

/// Sink emission errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Writing to the underlying store failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An append-only consumer of telemetry events.
///
/// `emit` must be safe under concurrent writers from different runs;
/// implementations serialize internally or accept lock-free append.
/// Events, once emitted, belong to the sink; the runtime never reads
/// them back.
pub trait TelemetrySink: Send + Sync {
    /// Append one event.
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Newline-delimited JSON file sink, the default wire format.
///
/// Each event becomes one JSON line. Writes are serialized through an
/// internal mutex so concurrent runs interleave whole lines, never
/// partial ones.
pub struct JsonlSink {
    file: Mutex<File>,
}

impl JsonlSink {
    /// Open (or create) the file at `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl TelemetrySink for JsonlSink {
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        let line = event.to_json()?;
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests and summary derivation.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Events for one run, in emission order.
    #[must_use]
    pub fn events_for_run(&self, run_id: &str) -> Vec<TelemetryEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.run_id.as_str() == run_id)
            .collect()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}
