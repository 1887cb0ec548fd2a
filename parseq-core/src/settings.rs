// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Execution settings describing how a query evaluates.

use std::time::Duration;

use crate::cancellation::CancellationToken;

/// Lower bound on [`ExecutionSettings::buffer_size`], guarding against
/// pathological channel thrashing.
pub const MIN_BUFFER_SIZE: usize = 10;

/// Default output-channel capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// How the query chooses its execution model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Let the engine decide (currently identical to `ForceParallel`).
    #[default]
    Auto,
    /// Always run the bounded worker pool at the configured concurrency.
    ForceParallel,
    /// Single-threaded cooperative execution: the pool with concurrency 1.
    Sequential,
}

/// How eagerly results are buffered between the pool and the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Hand each result to the consumer as soon as it is available.
    NotBuffered,
    /// Buffer up to `buffer_size` results (the default).
    #[default]
    AutoBuffered,
    /// Materialize the entire result set before the consumer sees any item.
    FullyBuffered,
}

/// Configuration snapshot propagated unchanged through operator composition.
///
/// Every `with_*` builder method returns the prior settings with a single
/// field updated. `with_timeout` keeps the minimum of the old and new values;
/// `with_cancellation` accumulates parents rather than replacing them, so
/// chained tokens all stay linked into the effective token.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    /// Ceiling on concurrent in-flight user operations.
    pub max_concurrency: usize,
    /// Output channel capacity.
    pub buffer_size: usize,
    /// Whether results are reassembled into source order.
    pub preserve_order: bool,
    /// Execution model selection.
    pub execution_mode: ExecutionMode,
    /// Result buffering strategy.
    pub merge_mode: MergeMode,
    /// Skip failing items instead of aborting the pipeline.
    pub continue_on_error: bool,
    /// Deadline for the whole enumeration; `None` means no deadline.
    pub timeout: Option<Duration>,
    /// Cancellation parents accumulated by `with_cancellation`.
    pub cancellations: Vec<CancellationToken>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_concurrency: host_parallelism(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            preserve_order: true,
            execution_mode: ExecutionMode::default(),
            merge_mode: MergeMode::default(),
            continue_on_error: false,
            timeout: None,
            cancellations: Vec::new(),
        }
    }
}

impl ExecutionSettings {
    /// Set the concurrency ceiling.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrency` is zero.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        assert!(max_concurrency >= 1, "max_concurrency must be at least 1");
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the output channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is below [`MIN_BUFFER_SIZE`].
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(
            buffer_size >= MIN_BUFFER_SIZE,
            "buffer_size must be at least {MIN_BUFFER_SIZE}"
        );
        self.buffer_size = buffer_size;
        self
    }

    /// Enable or disable source-order reassembly.
    #[must_use]
    pub fn with_order_preservation(mut self, preserve_order: bool) -> Self {
        self.preserve_order = preserve_order;
        self
    }

    /// Select the execution model.
    #[must_use]
    pub fn with_execution_mode(mut self, execution_mode: ExecutionMode) -> Self {
        self.execution_mode = execution_mode;
        self
    }

    /// Select the result buffering strategy.
    #[must_use]
    pub fn with_merge_mode(mut self, merge_mode: MergeMode) -> Self {
        self.merge_mode = merge_mode;
        self
    }

    /// Skip failing items and report them to the error sink instead of
    /// aborting the pipeline.
    #[must_use]
    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Attach a deadline. Chained calls keep the tightest deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(match self.timeout {
            Some(existing) => existing.min(timeout),
            None => timeout,
        });
        self
    }

    /// Link an additional cancellation parent. Chained calls accumulate;
    /// earlier parents keep firing through the composite.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellations.push(token);
        self
    }

    /// The concurrency the pool actually runs at, after applying the
    /// execution mode.
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        match self.execution_mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Auto | ExecutionMode::ForceParallel => self.max_concurrency,
        }
    }

    /// Output channel capacity after applying the merge mode.
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        match self.merge_mode {
            MergeMode::NotBuffered => 1,
            MergeMode::AutoBuffered | MergeMode::FullyBuffered => self.buffer_size,
        }
    }
}

fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_keeps_minimum() {
        let settings = ExecutionSettings::default()
            .with_timeout(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(10));
        assert_eq!(settings.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn cancellations_accumulate() {
        let first = CancellationToken::new();
        let second = CancellationToken::new();
        let settings = ExecutionSettings::default()
            .with_cancellation(first)
            .with_cancellation(second);
        assert_eq!(settings.cancellations.len(), 2);
    }

    #[test]
    fn sequential_mode_clamps_concurrency() {
        let settings = ExecutionSettings::default()
            .with_max_concurrency(8)
            .with_execution_mode(ExecutionMode::Sequential);
        assert_eq!(settings.effective_concurrency(), 1);
    }

    #[test]
    #[should_panic(expected = "max_concurrency")]
    fn zero_concurrency_is_rejected() {
        let _ = ExecutionSettings::default().with_max_concurrency(0);
    }

    #[test]
    #[should_panic(expected = "buffer_size")]
    fn tiny_buffer_is_rejected() {
        let _ = ExecutionSettings::default().with_buffer_size(4);
    }
}
