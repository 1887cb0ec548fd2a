// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Atomic counters surfaced by a running pipeline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;

/// Counters updated atomically by the engine while a pipeline runs.
///
/// `completed_utc` is set only on natural completion, never when the
/// pipeline was cancelled or failed.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    raw_records_parsed: AtomicU64,
    records_emitted: AtomicU64,
    error_count: AtomicU64,
    terminated_early: AtomicBool,
    completed_utc: Mutex<Option<SystemTime>>,
}

impl PipelineMetrics {
    /// Fresh metrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record pulled from the source.
    pub fn record_parsed(&self) {
        self.raw_records_parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one record handed to the consumer.
    pub fn record_emitted(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one reported error.
    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Flag that the pipeline terminated before draining its source.
    pub fn mark_terminated_early(&self) {
        self.terminated_early.store(true, Ordering::Release);
    }

    /// Stamp natural completion. A no-op if the pipeline already terminated
    /// early; repeated calls keep the first stamp.
    pub fn mark_completed(&self) {
        if self.terminated_early.load(Ordering::Acquire) {
            return;
        }
        let mut slot = self.completed_utc.lock();
        if slot.is_none() {
            *slot = Some(SystemTime::now());
        }
    }

    /// A point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            raw_records_parsed: self.raw_records_parsed.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            terminated_early: self.terminated_early.load(Ordering::Acquire),
            completed_utc: *self.completed_utc.lock(),
        }
    }
}

/// Point-in-time copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Records pulled from the source.
    pub raw_records_parsed: u64,
    /// Records handed to the consumer.
    pub records_emitted: u64,
    /// Errors reported to the sink.
    pub error_count: u64,
    /// Whether the pipeline stopped before draining its source.
    pub terminated_early: bool,
    /// Natural completion time, if the pipeline completed naturally.
    pub completed_utc: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_is_not_stamped_after_early_termination() {
        let metrics = PipelineMetrics::new();
        metrics.mark_terminated_early();
        metrics.mark_completed();

        let snapshot = metrics.snapshot();
        assert!(snapshot.terminated_early);
        assert!(snapshot.completed_utc.is_none());
    }

    #[test]
    fn counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.record_parsed();
        metrics.record_parsed();
        metrics.record_emitted();
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.raw_records_parsed, 2);
        assert_eq!(snapshot.records_emitted, 1);
        assert_eq!(snapshot.error_count, 1);
        assert!(!snapshot.terminated_early);
    }
}
