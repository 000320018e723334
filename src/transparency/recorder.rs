//! Fan-out of finished records to the configured sinks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::panic_message;

use super::store::TransparencySink;
use super::record::TransparencyRecord;

/// Delivers each record to every registered sink, in registration order.
#[derive(Clone, Default)]
pub struct TransparencyRecorder {
    sinks: Vec<Arc<dyn TransparencySink>>,
}

impl TransparencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a sink.
    pub fn with_sink(mut self, sink: Arc<dyn TransparencySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn TransparencySink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// A sink that panics is logged and skipped; the remaining sinks still
    /// receive the record.
    pub fn emit(&self, record: &TransparencyRecord) {
        for (index, sink) in self.sinks.iter().enumerate() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink.accept(record))) {
                log::error!(
                    "Transparency sink #{} panicked on record {}: {}",
                    index,
                    record.record_id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl std::fmt::Debug for TransparencyRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransparencyRecorder")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
