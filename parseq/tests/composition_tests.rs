// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! End-to-end flows crossing the multiplexer and the query engine.

use std::time::Duration;

use futures::stream;
use parseq::prelude::*;
use parseq_test_utils::ticking_stream;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_multiplexed_sequence_feeds_a_parallel_query() -> anyhow::Result<()> {
    // Arrange: two named producers fanned into one sequence
    let mux = Multiplexer::new();
    mux.register(
        "sensors",
        ticking_stream(vec![1, 2, 3], Duration::from_millis(3)),
    )?;
    mux.register(
        "backfill",
        ticking_stream(vec![100, 200, 300], Duration::from_millis(7)),
    )?;

    // Act: the merged stream goes through the parallel engine
    let mut values = ParallelQuery::from_results(mux.enumerate()?)
        .with_max_concurrency(4)
        .with_order_preservation(false)
        .map(|x| async move { x * 2 })
        .to_list()
        .await?;

    // Assert
    values.sort_unstable();
    assert_eq!(values, vec![2, 4, 6, 200, 400, 600]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn the_full_operator_surface_composes() -> anyhow::Result<()> {
    // Arrange + Act
    let values = stream::iter(0..50)
        .as_parallel()
        .with_max_concurrency(8)
        .with_buffer_size(32)
        .filter(|x| async move { x % 5 == 0 })
        .map(|x| async move { x / 5 })
        .flat_map(|x| async move { stream::iter(vec![x; 2]) })
        .take(8)
        .to_list()
        .await?;

    // Assert
    assert_eq!(values, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_producer_failure_fails_the_downstream_query() -> anyhow::Result<()> {
    // Arrange
    let mux = Multiplexer::new();
    mux.register_results(
        "wire",
        stream::iter(vec![
            Ok(1),
            Err(EngineError::user_function(0, std::io::Error::other("torn"))),
        ]),
    )?;

    // Act
    let outcome = ParallelQuery::from_results(mux.enumerate()?)
        .map(|x: i32| async move { x })
        .to_list()
        .await;

    // Assert: the wrapped source failure travels through the pool
    match outcome {
        Err(EngineError::Source { name, .. }) => assert_eq!(name, "wire"),
        other => panic!("expected the producer failure, got {other:?}"),
    }
    Ok(())
}
