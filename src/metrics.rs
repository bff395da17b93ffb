//! Custom-metric accumulator shared between caller code and the heartbeat.

use crate::codec::CustomMetrics;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// Collects metrics between heartbeat sends.
///
/// Writers append from any thread; the heartbeat drains the whole map in one
/// step, so every recorded value is sent exactly once.
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    pending: Mutex<CustomMetrics>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a metric. A later write to the same name before the next drain wins.
    pub fn record(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.lock().insert(name.into(), value.into());
    }

    /// Takes everything recorded so far and leaves the accumulator empty.
    pub fn drain(&self) -> CustomMetrics {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Insert and take are single steps, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, CustomMetrics> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[path = "tests/metrics_tests.rs"]
mod tests;
