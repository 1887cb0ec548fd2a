// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parseq_query::{AsParallel, ParallelQuery};
use parseq_test_utils::ticking_stream;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn take_stops_an_endless_pipeline_after_n_items() -> anyhow::Result<()> {
    // Arrange: a source that would tick for a long time
    let source = ticking_stream((0..1000).collect::<Vec<_>>(), Duration::from_millis(2));
    let query = source
        .as_parallel()
        .map(|x| async move { x * 2 })
        .take(5);
    let metrics = query.metrics();

    // Act
    let values = tokio::time::timeout(Duration::from_secs(5), query.to_list())
        .await
        .expect("take must terminate the pipeline promptly")?;

    // Assert
    assert_eq!(values, vec![0, 2, 4, 6, 8]);
    assert!(metrics.snapshot().terminated_early);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn workers_already_in_flight_complete_after_the_cut() -> anyhow::Result<()> {
    // Arrange
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    let started_probe = Arc::clone(&started);
    let finished_probe = Arc::clone(&finished);
    let values = ParallelQuery::from_iter(0..50)
        .with_max_concurrency(4)
        .map(move |x| {
            let started = Arc::clone(&started_probe);
            let finished = Arc::clone(&finished_probe);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                x
            }
        })
        .take(3)
        .to_list()
        .await?;

    // Assert: results past the cut are discarded, not interrupted
    assert_eq!(values, vec![0, 1, 2]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        started.load(Ordering::SeqCst),
        finished.load(Ordering::SeqCst)
    );
    Ok(())
}

#[tokio::test]
async fn taking_more_than_the_source_holds_completes_naturally() -> anyhow::Result<()> {
    // Arrange + Act
    let query = ParallelQuery::from_iter(0..3)
        .map(|x| async move { x })
        .take(10);
    let metrics = query.metrics();
    let values = query.to_list().await?;

    // Assert
    assert_eq!(values, vec![0, 1, 2]);
    assert!(!metrics.snapshot().terminated_early);
    assert!(metrics.snapshot().completed_utc.is_some());
    Ok(())
}

#[tokio::test]
async fn take_zero_yields_nothing() -> anyhow::Result<()> {
    let values = ParallelQuery::from_iter(0..10)
        .map(|x| async move { x })
        .take(0)
        .to_list()
        .await?;

    assert!(values.is_empty());
    Ok(())
}
