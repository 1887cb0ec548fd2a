// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::{Duration, Instant};

use futures::StreamExt;
use parseq_core::EngineError;
use parseq_query::AsParallel;
use parseq_test_utils::{never_stream, ticking_stream};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_cuts_off_a_slow_source() {
    // Arrange: one item every 50ms, 100 items, 150ms deadline
    let source = ticking_stream((0..100).collect::<Vec<_>>(), Duration::from_millis(50));
    let started = Instant::now();

    // Act
    let mut stream = source
        .as_parallel()
        .with_timeout(Duration::from_millis(150))
        .map(|x| async move { x })
        .into_stream();

    let mut values = Vec::new();
    let mut failure = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(value) => values.push(value),
            Err(error) => {
                failure = Some(error);
                break;
            }
        }
    }

    // Assert
    assert!(
        values.len() <= 4,
        "expected at most 4 items before the deadline, got {}",
        values.len()
    );
    assert!(matches!(failure, Some(EngineError::Cancelled { .. })));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn timeout_fires_even_when_the_source_never_yields() {
    // Arrange
    let started = Instant::now();

    // Act
    let outcome = never_stream::<i64>()
        .as_parallel()
        .with_timeout(Duration::from_millis(100))
        .map(|x| async move { x })
        .to_list()
        .await;

    // Assert: cancellation within the deadline plus a scheduling quantum
    let error = outcome.expect_err("the deadline must fire");
    assert!(error.is_cancellation());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn pipelines_without_a_deadline_complete_normally() -> anyhow::Result<()> {
    let values = futures::stream::iter(0..5)
        .as_parallel()
        .map(|x| async move { x })
        .to_list()
        .await?;

    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    Ok(())
}
