// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Enumeration-time options for the multiplexer.

use std::sync::Arc;

use parseq_core::{CancellationToken, ErrorSink, NullSink};

/// The rule used to pick the next producer to emit from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fairness {
    /// Whichever producer has an item ready first wins. Maximizes throughput;
    /// cross-producer order is non-deterministic and a consistently fast
    /// producer may dominate.
    #[default]
    FirstAvailable,
    /// Producers take strict turns around a ring; no producer can starve
    /// another indefinitely. A producer whose item is rejected by its
    /// predicate does not spend its turn.
    RoundRobin,
}

/// What happens when one producer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// The failure surfaces to the consumer wrapped with the producer's
    /// name; the remaining producers are dropped and drained.
    #[default]
    FailFast,
    /// The failing producer is removed and the failure reported to the error
    /// sink; the rest keep going. When every producer has failed the stream
    /// ends normally.
    ContinueOnError,
}

/// Options applied to each enumeration of a multiplexer.
#[derive(Clone)]
pub struct MuxOptions {
    /// Producer selection rule.
    pub fairness: Fairness,
    /// Cross-producer error policy.
    pub error_mode: ErrorMode,
    /// Consumer cancellation token, observed before every producer poll.
    pub cancellation: Option<CancellationToken>,
    /// Receiver for continue-on-error reports.
    pub sink: Arc<dyn ErrorSink>,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            fairness: Fairness::default(),
            error_mode: ErrorMode::default(),
            cancellation: None,
            sink: Arc::new(NullSink),
        }
    }
}

impl MuxOptions {
    /// Options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the producer fairness rule.
    #[must_use]
    pub fn with_fairness(mut self, fairness: Fairness) -> Self {
        self.fairness = fairness;
        self
    }

    /// Select the cross-producer error policy.
    #[must_use]
    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    /// Observe `token` before every producer poll.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Route continue-on-error reports to `sink`.
    #[must_use]
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl std::fmt::Debug for MuxOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuxOptions")
            .field("fairness", &self.fairness)
            .field("error_mode", &self.error_mode)
            .field("cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}
