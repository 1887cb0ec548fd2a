// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Entry points turning plain streams into parallel queries.

use futures::Stream;
use parseq_core::ExecutionSettings;

use crate::query::ParallelQuery;

/// Extension trait putting [`as_parallel`](AsParallel::as_parallel) on every
/// async sequence.
pub trait AsParallel: Stream + Sized {
    /// Evaluate this sequence through the parallel engine with default
    /// settings.
    fn as_parallel(self) -> ParallelQuery<Self::Item>
    where
        Self: Send + 'static,
        Self::Item: Send + 'static,
    {
        ParallelQuery::from_stream(self)
    }

    /// Evaluate this sequence through the parallel engine with the given
    /// settings snapshot.
    fn as_parallel_with(self, settings: ExecutionSettings) -> ParallelQuery<Self::Item>
    where
        Self: Send + 'static,
        Self::Item: Send + 'static,
    {
        ParallelQuery::from_stream(self).with_settings(settings)
    }
}

impl<S: Stream + Sized> AsParallel for S {}
