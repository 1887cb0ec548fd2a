// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The [`ParallelQuery`] builder.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::{Future, Stream, StreamExt};
use parseq_core::{
    compose, CancellationToken, ErrorSink, ExecutionMode, ExecutionSettings, MergeMode, NullSink,
    PipelineMetrics, Result,
};
use parseq_exec::{
    filter_stage, flat_map_stage, map_stage, try_filter_stage, try_flat_map_stage, try_map_stage,
    StageContext, TakeStream,
};

use crate::stream::QueryStream;

type BuildFn<T> = Box<dyn FnOnce(&StageContext) -> BoxStream<'static, Result<T>> + Send>;

/// A lazy parallel query over an async sequence.
///
/// The query holds its source and operator chain as an unevaluated
/// constructor plus an [`ExecutionSettings`] snapshot. Pulling the query
/// composes the effective cancellation token, instantiates one pool stage
/// per operator, and returns the output stream.
pub struct ParallelQuery<T: Send + 'static> {
    build: BuildFn<T>,
    settings: ExecutionSettings,
    sink: Arc<dyn ErrorSink>,
    metrics: Arc<PipelineMetrics>,
}

impl<T: Send + 'static> ParallelQuery<T> {
    /// Build a query over any async sequence.
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::from_results(source.map(Ok))
    }

    /// Build a query over an async sequence that can itself fail, such as a
    /// multiplexer enumeration. An `Err` item aborts the pipeline.
    pub fn from_results<S>(source: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            build: Box::new(move |ctx| {
                let metrics = Arc::clone(&ctx.metrics);
                source
                    .inspect(move |item| {
                        if item.is_ok() {
                            metrics.record_parsed();
                        }
                    })
                    .boxed()
            }),
            settings: ExecutionSettings::default(),
            sink: Arc::new(NullSink),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build a query over an in-memory collection.
    pub fn from_iter<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stream(futures::stream::iter(source))
    }

    /// Replace the whole settings snapshot.
    #[must_use]
    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the concurrency ceiling.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrency` is zero.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.settings = self.settings.with_max_concurrency(max_concurrency);
        self
    }

    /// Set the output channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is below [`parseq_core::MIN_BUFFER_SIZE`].
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.settings = self.settings.with_buffer_size(buffer_size);
        self
    }

    /// Enable or disable source-order reassembly.
    #[must_use]
    pub fn with_order_preservation(mut self, preserve_order: bool) -> Self {
        self.settings = self.settings.with_order_preservation(preserve_order);
        self
    }

    /// Select the execution model.
    #[must_use]
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.settings = self.settings.with_execution_mode(mode);
        self
    }

    /// Select the result buffering strategy.
    #[must_use]
    pub fn with_merge_mode(mut self, mode: MergeMode) -> Self {
        self.settings = self.settings.with_merge_mode(mode);
        self
    }

    /// Skip failing items instead of aborting the pipeline; failures go to
    /// the error sink.
    #[must_use]
    pub fn continue_on_error(mut self) -> Self {
        self.settings = self.settings.continue_on_error();
        self
    }

    /// Attach a deadline. Chained calls keep the tightest deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings = self.settings.with_timeout(timeout);
        self
    }

    /// Link a cancellation token. Chained calls accumulate parents; every
    /// linked token can halt the pipeline.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.settings = self.settings.with_cancellation(token);
        self
    }

    /// Route continue-on-error reports to `sink` instead of discarding them.
    #[must_use]
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The settings this query would run with.
    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Counters for this query's (eventual) execution.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Transform every item with an async function at the configured
    /// concurrency.
    pub fn map<U, F, Fut>(self, f: F) -> ParallelQuery<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        let build = self.build;
        ParallelQuery {
            build: Box::new(move |ctx| map_stage(build(ctx), ctx.clone(), f)),
            settings: self.settings,
            sink: self.sink,
            metrics: self.metrics,
        }
    }

    /// Fallible [`map`](Self::map): failures follow the configured error
    /// policy.
    pub fn try_map<U, E, F, Fut>(self, f: F) -> ParallelQuery<U>
    where
        U: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<U, E>> + Send + 'static,
    {
        let build = self.build;
        ParallelQuery {
            build: Box::new(move |ctx| try_map_stage(build(ctx), ctx.clone(), f)),
            settings: self.settings,
            sink: self.sink,
            metrics: self.metrics,
        }
    }

    /// Keep only the items for which the async predicate returns `true`.
    pub fn filter<F, Fut>(self, predicate: F) -> ParallelQuery<T>
    where
        T: Clone,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let build = self.build;
        ParallelQuery {
            build: Box::new(move |ctx| filter_stage(build(ctx), ctx.clone(), predicate)),
            settings: self.settings,
            sink: self.sink,
            metrics: self.metrics,
        }
    }

    /// Fallible [`filter`](Self::filter).
    pub fn try_filter<E, F, Fut>(self, predicate: F) -> ParallelQuery<T>
    where
        T: Clone,
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<bool, E>> + Send + 'static,
    {
        let build = self.build;
        ParallelQuery {
            build: Box::new(move |ctx| try_filter_stage(build(ctx), ctx.clone(), predicate)),
            settings: self.settings,
            sink: self.sink,
            metrics: self.metrics,
        }
    }

    /// Expand every item into an async sub-sequence.
    pub fn flat_map<U, S2, F, Fut>(self, f: F) -> ParallelQuery<U>
    where
        U: Send + 'static,
        S2: Stream<Item = U> + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = S2> + Send + 'static,
    {
        let build = self.build;
        ParallelQuery {
            build: Box::new(move |ctx| flat_map_stage(build(ctx), ctx.clone(), f)),
            settings: self.settings,
            sink: self.sink,
            metrics: self.metrics,
        }
    }

    /// Fallible [`flat_map`](Self::flat_map).
    pub fn try_flat_map<U, E, S2, F, Fut>(self, f: F) -> ParallelQuery<U>
    where
        U: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        S2: Stream<Item = U> + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<S2, E>> + Send + 'static,
    {
        let build = self.build;
        ParallelQuery {
            build: Box::new(move |ctx| try_flat_map_stage(build(ctx), ctx.clone(), f)),
            settings: self.settings,
            sink: self.sink,
            metrics: self.metrics,
        }
    }

    /// Stop after `n` items have been handed to the consumer. Workers already
    /// in flight complete naturally; their results are discarded.
    #[must_use]
    pub fn take(self, n: usize) -> ParallelQuery<T> {
        let build = self.build;
        ParallelQuery {
            build: Box::new(move |ctx| {
                TakeStream::new(
                    build(ctx),
                    n,
                    ctx.token.clone(),
                    Arc::clone(&ctx.metrics),
                )
                .boxed()
            }),
            settings: self.settings,
            sink: self.sink,
            metrics: self.metrics,
        }
    }

    /// Execute the query and return its output stream.
    ///
    /// Dropping the stream before it ends cancels the pipeline and waits for
    /// in-flight work cooperatively in the background.
    pub fn into_stream(self) -> QueryStream<T> {
        let (token, scope) = compose(&self.settings.cancellations, self.settings.timeout);
        let fully_buffered = self.settings.merge_mode == MergeMode::FullyBuffered;
        let ctx = StageContext {
            token: token.clone(),
            settings: self.settings,
            sink: self.sink,
            metrics: Arc::clone(&self.metrics),
        };

        let mut inner = (self.build)(&ctx);
        if fully_buffered {
            inner = buffer_fully(inner);
        }

        QueryStream::new(inner, token, scope, self.metrics)
    }

    /// Execute the query and collect every result.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline error: the wrapped user failure under
    /// fail-fast, or a cancellation error when the effective token fired.
    pub async fn to_list(self) -> Result<Vec<T>> {
        let mut stream = self.into_stream();
        let mut values = Vec::new();
        while let Some(item) = stream.next().await {
            values.push(item?);
        }
        Ok(values)
    }
}

/// Materialize the entire result set before the consumer sees the first
/// item. A pipeline error discards the buffer and surfaces immediately.
fn buffer_fully<T: Send + 'static>(
    inner: BoxStream<'static, Result<T>>,
) -> BoxStream<'static, Result<T>> {
    async_stream::stream! {
        let mut buffered = Vec::new();
        futures::pin_mut!(inner);
        while let Some(item) = inner.next().await {
            match item {
                Ok(value) => buffered.push(value),
                Err(error) => {
                    yield Err(error);
                    return;
                }
            }
        }
        for value in buffered {
            yield Ok(value);
        }
    }
    .boxed()
}

impl<T: Send + 'static> std::fmt::Debug for ParallelQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelQuery")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
