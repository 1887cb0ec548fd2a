// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::{stream, StreamExt};
use parseq_core::{
    CancellationToken, EngineError, ExecutionSettings, NullSink, PipelineMetrics,
};
use parseq_exec::{map_stage, StageContext};
use parseq_test_utils::ticking_stream;

fn stage_context(token: CancellationToken, settings: ExecutionSettings) -> StageContext {
    StageContext {
        token,
        settings,
        sink: Arc::new(NullSink),
        metrics: Arc::new(PipelineMetrics::new()),
    }
}

fn int_source(count: i64) -> BoxStream<'static, Result<i64, EngineError>> {
    stream::iter(0..count).map(Ok).boxed()
}

#[tokio::test]
async fn pre_cancelled_token_fails_before_the_first_pull() {
    // Arrange
    let token = CancellationToken::new();
    token.cancel();
    let invoked = Arc::new(AtomicUsize::new(0));

    // Act
    let probe = Arc::clone(&invoked);
    let output = map_stage(
        int_source(10),
        stage_context(token, ExecutionSettings::default()),
        move |x| {
            let invoked = Arc::clone(&probe);
            async move {
                invoked.fetch_add(1, Ordering::SeqCst);
                x
            }
        },
    );
    let outcome: Vec<_> = output.collect().await;

    // Assert: cancellation on the first suspension, not after the first item
    assert_eq!(outcome.len(), 1);
    assert!(matches!(
        outcome[0],
        Err(EngineError::Cancelled { .. })
    ));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelling_mid_stream_stops_new_work_and_drains_in_flight() {
    // Arrange
    let token = CancellationToken::new();
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    let source = ticking_stream((0..100).collect::<Vec<_>>(), Duration::from_millis(5))
        .map(Ok)
        .boxed();

    // Act
    let started_probe = Arc::clone(&started);
    let finished_probe = Arc::clone(&finished);
    let output = map_stage(
        source,
        stage_context(
            token.clone(),
            ExecutionSettings::default().with_max_concurrency(4),
        ),
        move |x| {
            let started = Arc::clone(&started_probe);
            let finished = Arc::clone(&finished_probe);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                x
            }
        },
    );

    let canceller = tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            token.cancel();
        }
    });

    let outcome: Vec<_> = output.collect().await;
    canceller.await.unwrap();

    // Assert: the stream terminated with a cancellation error, far short of
    // the full source, and every started worker ran to completion
    assert!(matches!(
        outcome.last(),
        Some(Err(EngineError::Cancelled { .. }))
    ));
    assert!(outcome.len() < 100);
    assert_eq!(
        started.load(Ordering::SeqCst),
        finished.load(Ordering::SeqCst),
        "in-flight operations must complete cooperatively"
    );
}

#[tokio::test]
async fn cancellation_is_observed_while_waiting_on_a_silent_source() {
    // Arrange: a source that never yields
    let token = CancellationToken::new();
    let output = map_stage(
        parseq_test_utils::never_stream::<i64>().map(Ok).boxed(),
        stage_context(token.clone(), ExecutionSettings::default()),
        |x| async move { x },
    );

    // Act
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
    });
    let outcome: Vec<_> = tokio::time::timeout(Duration::from_secs(2), output.collect())
        .await
        .expect("cancellation must break the wait on the source");

    // Assert
    assert_eq!(outcome.len(), 1);
    assert!(matches!(
        outcome[0],
        Err(EngineError::Cancelled { .. })
    ));
}
