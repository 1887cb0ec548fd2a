// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The consumer-facing output stream of an executed query.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::Stream;
use parseq_core::{CancellationScope, CancellationToken, PipelineMetrics, Result};
use pin_project::{pin_project, pinned_drop};

/// Output stream of a running pipeline.
///
/// Owns the effective cancellation token and its release scope. Dropping the
/// stream before it ends fires the token, so an early-stopping consumer
/// tears the pool down cooperatively; the scope releases composite-token
/// resources on every exit path.
#[pin_project(PinnedDrop)]
pub struct QueryStream<T> {
    #[pin]
    inner: BoxStream<'static, Result<T>>,
    token: CancellationToken,
    scope: Option<CancellationScope>,
    metrics: Arc<PipelineMetrics>,
    finished: bool,
}

impl<T> QueryStream<T> {
    pub(crate) fn new(
        inner: BoxStream<'static, Result<T>>,
        token: CancellationToken,
        scope: CancellationScope,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            inner,
            token,
            scope: Some(scope),
            metrics,
            finished: false,
        }
    }

    /// The effective cancellation token driving this pipeline.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<T> Stream for QueryStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(value))) => {
                this.metrics.record_emitted();
                Poll::Ready(Some(Ok(value)))
            }
            Poll::Ready(Some(Err(error))) => {
                // Errors are terminal; release linked resources right away
                *this.finished = true;
                this.metrics.mark_terminated_early();
                if let Some(mut scope) = this.scope.take() {
                    scope.release();
                }
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                *this.finished = true;
                this.metrics.mark_completed();
                if let Some(mut scope) = this.scope.take() {
                    scope.release();
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[pinned_drop]
impl<T> PinnedDrop for QueryStream<T> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        if !*this.finished {
            // Early consumer drop: signal the pipeline; in-flight workers
            // drain cooperatively in the background
            this.metrics.mark_terminated_early();
            this.token.cancel();
        }
        // `scope` drops here, releasing parent links and the timer
    }
}
