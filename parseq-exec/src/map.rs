// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Parallel map stage: one user async function invocation per source item.

use futures::stream::BoxStream;
use futures::Future;
use parseq_core::{EngineError, Item};

use crate::pool::{run_stage, StageContext};
use crate::reorder::Arrival;

/// Apply an infallible async transform at the configured concurrency.
///
/// Output order follows `preserve_order`: source order when `true`,
/// completion order otherwise.
pub fn map_stage<T, U, F, Fut>(
    source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    f: F,
) -> BoxStream<'static, Result<U, EngineError>>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = U> + Send + 'static,
{
    run_stage(source, ctx, move |item: Item<T>, arrivals, _env| {
        let (payload, index) = item.into_parts();
        let computation = f(payload);
        async move {
            let value = computation.await;
            let _ = arrivals
                .send(Arrival::Whole {
                    index,
                    output: Some(value),
                })
                .await;
        }
    })
}

/// Apply a fallible async transform.
///
/// A failing item either aborts the stage (fail-fast, the default) or is
/// skipped and reported to the error sink (`continue_on_error`).
pub fn try_map_stage<T, U, E, F, Fut>(
    source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    f: F,
) -> BoxStream<'static, Result<U, EngineError>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<U, E>> + Send + 'static,
{
    run_stage(source, ctx, move |item: Item<T>, arrivals, env| {
        let (payload, index) = item.into_parts();
        let computation = f(payload);
        async move {
            match computation.await {
                Ok(value) => {
                    let _ = arrivals
                        .send(Arrival::Whole {
                            index,
                            output: Some(value),
                        })
                        .await;
                }
                Err(cause) => {
                    let error = EngineError::user_function(index, cause);
                    if env.continue_on_error {
                        env.report_skipped(index, error);
                        let _ = arrivals.send(Arrival::Whole { index, output: None }).await;
                    } else {
                        env.fail_fast(error);
                    }
                }
            }
        }
    })
}
