// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Take operator: stop the pipeline once enough items reached the consumer.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::Stream;
use parseq_core::{CancellationToken, EngineError, PipelineMetrics};

/// Passes through the first `n` values, then fires the effective token and
/// drops the upstream so already-spawned workers drain naturally.
///
/// Errors are forwarded unchanged and do not count against the limit.
pub struct TakeStream<U> {
    inner: Option<BoxStream<'static, Result<U, EngineError>>>,
    remaining: usize,
    token: CancellationToken,
    metrics: Arc<PipelineMetrics>,
}

impl<U> TakeStream<U> {
    /// Limit `inner` to `n` delivered values.
    pub fn new(
        inner: BoxStream<'static, Result<U, EngineError>>,
        n: usize,
        token: CancellationToken,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            inner: Some(inner),
            remaining: n,
            token,
            metrics,
        }
    }

    fn cut(&mut self) {
        if self.inner.take().is_some() {
            self.metrics.mark_terminated_early();
            self.token.cancel();
        }
    }
}

impl<U> Stream for TakeStream<U> {
    type Item = Result<U, EngineError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.remaining == 0 {
            this.cut();
            return Poll::Ready(None);
        }
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(value))) => {
                this.remaining -= 1;
                if this.remaining == 0 {
                    this.cut();
                }
                Poll::Ready(Some(Ok(value)))
            }
            Poll::Ready(Some(Err(error))) => Poll::Ready(Some(Err(error))),
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
