// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The bounded worker pool driving asynchronous parallel execution.
//!
//! Each stage runs three kinds of tasks:
//!
//! - a *dispatcher* that pulls the source, acquires a semaphore permit per
//!   item and spawns a worker into a [`JoinSet`];
//! - *workers* that run the user function and publish [`Arrival`] messages;
//! - a *coordinator* that turns arrivals into output, either through the
//!   [`Resequencer`] (order preserved) or by passing values straight through.
//!
//! The effective cancellation token is observed before every suspension
//! point. Cancellation is cooperative: no in-flight worker is killed, the
//! dispatcher stops pulling and waits for the `JoinSet` to drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{Future, StreamExt};
use parking_lot::Mutex;
use parseq_core::{
    CancellationToken, EngineError, ErrorEvent, ErrorSink, ExecutionSettings, Item,
    PipelineMetrics,
};
use tokio::sync::mpsc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;

use crate::logging::*;
use crate::reorder::{Arrival, Resequencer};

/// Everything a stage needs at execution time: the effective token, the
/// settings snapshot, the error sink and the metrics handle.
#[derive(Clone)]
pub struct StageContext {
    /// Effective cancellation token composed for this enumeration.
    pub token: CancellationToken,
    /// Settings snapshot.
    pub settings: ExecutionSettings,
    /// Receiver for continue-on-error and secondary error reports.
    pub sink: Arc<dyn ErrorSink>,
    /// Counters for this pipeline.
    pub metrics: Arc<PipelineMetrics>,
}

/// Per-worker view of the stage: error policy plus the shared fail-fast slot.
#[derive(Clone)]
pub struct WorkerEnv {
    /// Effective cancellation token.
    pub token: CancellationToken,
    /// Whether failing items are skipped instead of aborting the stage.
    pub continue_on_error: bool,
    sink: Arc<dyn ErrorSink>,
    metrics: Arc<PipelineMetrics>,
    first_error: Arc<Mutex<Option<EngineError>>>,
}

impl WorkerEnv {
    /// Record a skipped item under continue-on-error: report to the sink and
    /// bump the error counter. The caller still publishes a cursor-advancing
    /// arrival.
    pub fn report_skipped(&self, index: u64, error: EngineError) {
        self.metrics.record_error();
        self.sink.report(ErrorEvent::user_function(index, error));
    }

    /// Abort the stage under fail-fast: park the first error for the
    /// consumer, log any concurrent error as a secondary cause, and fire the
    /// effective token so the dispatcher stops pulling.
    pub fn fail_fast(&self, error: EngineError) {
        {
            let mut slot = self.first_error.lock();
            if slot.is_none() {
                *slot = Some(error);
            } else {
                self.metrics.record_error();
                self.sink.report(ErrorEvent::secondary(error));
            }
        }
        self.token.cancel();
    }
}

struct StageShared {
    token: CancellationToken,
    metrics: Arc<PipelineMetrics>,
    first_error: Arc<Mutex<Option<EngineError>>>,
    source_exhausted: AtomicBool,
}

/// Run one pool stage over `source`, publishing through a bounded channel.
///
/// `worker` is invoked once per [`Item`] with the arrival channel and a
/// [`WorkerEnv`]; it owns the full per-item protocol, including error
/// policy.
pub(crate) fn run_stage<T, U, W, Fut>(
    source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    worker: W,
) -> BoxStream<'static, Result<U, EngineError>>
where
    T: Send + 'static,
    U: Send + 'static,
    W: Fn(Item<T>, mpsc::Sender<Arrival<U>>, WorkerEnv) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::channel(ctx.settings.channel_capacity());
    let (arrival_tx, arrival_rx) = mpsc::channel(ctx.settings.buffer_size);

    let shared = Arc::new(StageShared {
        token: ctx.token.clone(),
        metrics: Arc::clone(&ctx.metrics),
        first_error: Arc::new(Mutex::new(None)),
        source_exhausted: AtomicBool::new(false),
    });

    let env = WorkerEnv {
        token: ctx.token.clone(),
        continue_on_error: ctx.settings.continue_on_error,
        sink: Arc::clone(&ctx.sink),
        metrics: Arc::clone(&ctx.metrics),
        first_error: Arc::clone(&shared.first_error),
    };

    tokio::spawn(coordinate(
        arrival_rx,
        out_tx,
        ctx.settings.preserve_order,
        Arc::clone(&shared),
    ));
    tokio::spawn(dispatch(source, ctx, arrival_tx, env, shared, worker));

    ReceiverStream::new(out_rx).boxed()
}

/// Pull the source, bound concurrency with the semaphore, spawn workers.
async fn dispatch<T, U, W, Fut>(
    mut source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    arrival_tx: mpsc::Sender<Arrival<U>>,
    env: WorkerEnv,
    shared: Arc<StageShared>,
    worker: W,
) where
    T: Send + 'static,
    U: Send + 'static,
    W: Fn(Item<T>, mpsc::Sender<Arrival<U>>, WorkerEnv) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(ctx.settings.effective_concurrency()));
    let mut workers = JoinSet::new();
    let mut index: u64 = 0;

    loop {
        // Backpressure: a permit per in-flight user operation
        let permit = tokio::select! {
            biased;
            () = ctx.token.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => {
                permit.expect("pool semaphore is never closed")
            }
        };

        // The token is observed before every pull, so a source that never
        // yields cannot outlive a deadline
        let next = tokio::select! {
            biased;
            () = ctx.token.cancelled() => break,
            next = source.next() => next,
        };

        let payload = match next {
            Some(Ok(payload)) => payload,
            Some(Err(error)) => {
                // Upstream failure is already shaped; park it and stop
                env.fail_fast(error);
                break;
            }
            None => {
                shared.source_exhausted.store(true, Ordering::Release);
                break;
            }
        };

        let task = worker(Item::new(payload, index), arrival_tx.clone(), env.clone());
        workers.spawn(async move {
            task.await;
            drop(permit);
        });
        index += 1;
    }

    if ctx.token.is_cancelled() {
        debug!("pool cancelling: waiting for {} in-flight workers", workers.len());
    } else {
        debug!("pool draining after {} dispatched items", index);
    }

    // Cooperative shutdown: in-flight workers run to completion
    while workers.join_next().await.is_some() {}

    // Dropping the last arrival sender lets the coordinator finish
    drop(arrival_tx);
}

/// Turn arrivals into output, resequencing when order must be preserved.
async fn coordinate<U>(
    mut arrivals: mpsc::Receiver<Arrival<U>>,
    out: mpsc::Sender<Result<U, EngineError>>,
    preserve_order: bool,
    shared: Arc<StageShared>,
) where
    U: Send + 'static,
{
    if preserve_order {
        let mut resequencer = Resequencer::new();
        let mut ready = Vec::new();
        while let Some(arrival) = arrivals.recv().await {
            resequencer.push(arrival);
            resequencer.drain_ready(&mut ready);
            for value in ready.drain(..) {
                if out.send(Ok(value)).await.is_err() {
                    // Consumer is gone; unblock the workers and bail
                    arrivals.close();
                    return;
                }
            }
        }
    } else {
        while let Some(arrival) = arrivals.recv().await {
            let value = match arrival {
                Arrival::Whole {
                    output: Some(value),
                    ..
                }
                | Arrival::Part { value, .. } => value,
                Arrival::Whole { output: None, .. } | Arrival::PartsEnd { .. } => continue,
            };
            if out.send(Ok(value)).await.is_err() {
                arrivals.close();
                return;
            }
        }
    }

    // All workers and the dispatcher are done; surface the stage outcome
    let parked = shared.first_error.lock().take();
    if let Some(error) = parked {
        let _ = out.send(Err(error)).await;
    } else if shared.token.is_cancelled() && !shared.source_exhausted.load(Ordering::Acquire) {
        shared.metrics.mark_terminated_early();
        let _ = out
            .send(Err(EngineError::cancelled(
                "pipeline cancelled before the source was drained",
            )))
            .await;
    }
}
