// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Parallel filter stage.
//!
//! Workers evaluate the async predicate; a passing item is forwarded with its
//! original index, a rejected one is published as a drop so the resequencer
//! can advance its cursor without waiting.

use futures::stream::BoxStream;
use futures::Future;
use parseq_core::{EngineError, Item};

use crate::pool::{run_stage, StageContext};
use crate::reorder::Arrival;

/// Keep only the items for which the async predicate returns `true`.
pub fn filter_stage<T, F, Fut>(
    source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    predicate: F,
) -> BoxStream<'static, Result<T, EngineError>>
where
    T: Clone + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    run_stage(source, ctx, move |item: Item<T>, arrivals, _env| {
        let (payload, index) = item.into_parts();
        let verdict = predicate(payload.clone());
        async move {
            let output = verdict.await.then_some(payload);
            let _ = arrivals.send(Arrival::Whole { index, output }).await;
        }
    })
}

/// Keep only the items for which the fallible async predicate returns
/// `Ok(true)`; failing items follow the configured error policy.
pub fn try_filter_stage<T, E, F, Fut>(
    source: BoxStream<'static, Result<T, EngineError>>,
    ctx: StageContext,
    predicate: F,
) -> BoxStream<'static, Result<T, EngineError>>
where
    T: Clone + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<bool, E>> + Send + 'static,
{
    run_stage(source, ctx, move |item: Item<T>, arrivals, env| {
        let (payload, index) = item.into_parts();
        let verdict = predicate(payload.clone());
        async move {
            match verdict.await {
                Ok(keep) => {
                    let output = keep.then_some(payload);
                    let _ = arrivals.send(Arrival::Whole { index, output }).await;
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
