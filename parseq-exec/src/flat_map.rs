// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Parallel flat-map stage.
//!
//! Each worker drains its own sub-sequence. Sub-items inherit the parent's
//! source index plus a sub-position for lexicographic reassembly; an
//! end-of-sub-sequence sentinel lets the resequencer move on to the next
//! parent. Without order preservation, sub-items stream as they are produced.

use futures::stream::BoxStream;
use futures::{Future, Stream, StreamExt};
use parseq_core::{EngineError, Item};

use crate::pool::{run_stage, StageContext};
use crate::reorder::Arrival;

/// Expand every item into an async sub-sequence at the configured
/// concurrency.
pub fn flat_map_stage<T, U, S2, F, Fut>(
    source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    f: F,
) -> BoxStream<'static, Result<U, EngineError>>
where
    T: Send + 'static,
    U: Send + 'static,
    S2: Stream<Item = U> + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = S2> + Send + 'static,
{
    run_stage(source, ctx, move |item: Item<T>, arrivals, env| {
        let (payload, index) = item.into_parts();
        let expansion = f(payload);
        async move {
            let sub = expansion.await;
            drain_sub_sequence(index, sub, &arrivals, &env).await;
        }
    })
}

/// Fallible variant: a failing expansion follows the configured error policy.
pub fn try_flat_map_stage<T, U, E, S2, F, Fut>(
    source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    f: F,
) -> BoxStream<'static, Result<U, EngineError>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    S2: Stream<Item = U> + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<S2, E>> + Send + 'static,
{
    run_stage(source, ctx, move |item: Item<T>, arrivals, env| {
        let (payload, index) = item.into_parts();
        let expansion = f(payload);
        async move {
            match expansion.await {
                Ok(sub) => drain_sub_sequence(index, sub, &arrivals, &env).await,
                Err(cause) => {
                    let error = EngineError::user_function(index, cause);
                    if env.continue_on_error {
                        env.report_skipped(index, error);
                        let _ = arrivals.send(Arrival::PartsEnd { index }).await;
                    } else {
                        env.fail_fast(error);
                    }
                }
            }
        }
    })
}

async fn drain_sub_sequence<U, S2>(
    index: u64,
    sub: S2,
    arrivals: &tokio::sync::mpsc::Sender<Arrival<U>>,
    env: &crate::pool::WorkerEnv,
) where
    U: Send + 'static,
    S2: Stream<Item = U> + Send + 'static,
{
    futures::pin_mut!(sub);
    let mut position: u64 = 0;
    loop {
        let next = tokio::select! {
            biased;
            () = env.token.cancelled() => break,
            next = sub.next() => next,
        };
        let Some(value) = next else { break };
        if arrivals
            .send(Arrival::Part {
                index,
                sub: position,
                value,
            })
            .await
            .is_err()
        {
            return;
        }
        position += 1;
    }
    let _ = arrivals.send(Arrival::PartsEnd { index }).await;
}
