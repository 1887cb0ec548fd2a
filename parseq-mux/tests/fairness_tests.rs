// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::stream;
use parseq_mux::{Fairness, Multiplexer, MuxOptions};
use parseq_test_utils::collect_ok;

#[tokio::test]
async fn round_robin_alternates_between_continually_ready_producers() -> anyhow::Result<()> {
    // Arrange: both producers are always ready
    let mux = Multiplexer::new()
        .with_options(MuxOptions::new().with_fairness(Fairness::RoundRobin));
    mux.register("left", stream::iter(vec![1, 2, 3, 4]))?;
    mux.register("right", stream::iter(vec![10, 20, 30, 40]))?;

    // Act
    let values = collect_ok(mux.enumerate()?).await;

    // Assert: after any prefix the delivered counts differ by at most one
    assert_eq!(values.len(), 8);
    let mut left_count = 0i64;
    let mut right_count = 0i64;
    for value in &values {
        if *value < 10 {
            left_count += 1;
        } else {
            right_count += 1;
        }
        assert!(
            (left_count - right_count).abs() <= 1,
            "prefix imbalance: {left_count} vs {right_count} in {values:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn round_robin_keeps_serving_after_one_producer_completes() -> anyhow::Result<()> {
    // Arrange
    let mux = Multiplexer::new()
        .with_options(MuxOptions::new().with_fairness(Fairness::RoundRobin));
    mux.register("short", stream::iter(vec![1]))?;
    mux.register("long", stream::iter(vec![10, 20, 30]))?;

    // Act
    let mut values = collect_ok(mux.enumerate()?).await;

    // Assert
    values.sort_unstable();
    assert_eq!(values, vec![1, 10, 20, 30]);
    Ok(())
}

#[tokio::test]
async fn predicate_rejections_do_not_spend_a_fairness_turn() -> anyhow::Result<()> {
    // Arrange: the filtered producer's rejected items must not count as its
    // turn, so the accepted items still alternate with the other producer
    let mux = Multiplexer::new()
        .with_options(MuxOptions::new().with_fairness(Fairness::RoundRobin));
    mux.register_filtered("evens", stream::iter(vec![1, 2, 3, 4]), |x| x % 2 == 0)?;
    mux.register("tens", stream::iter(vec![10, 20]))?;

    // Act
    let values = collect_ok(mux.enumerate()?).await;

    // Assert
    assert_eq!(values, vec![2, 10, 4, 20]);
    Ok(())
}

#[tokio::test]
async fn first_available_delivers_everything_with_per_producer_order() -> anyhow::Result<()> {
    // Arrange
    let mux = Multiplexer::new()
        .with_options(MuxOptions::new().with_fairness(Fairness::FirstAvailable));
    mux.register("a", stream::iter(vec![1, 2, 3]))?;
    mux.register("b", stream::iter(vec![10, 20, 30]))?;

    // Act
    let values = collect_ok(mux.enumerate()?).await;

    // Assert: interleaving is unspecified, per-producer order is not
    assert_eq!(values.len(), 6);
    let a: Vec<_> = values.iter().copied().filter(|v| *v < 10).collect();
    let b: Vec<_> = values.iter().copied().filter(|v| *v >= 10).collect();
    assert_eq!(a, vec![1, 2, 3]);
    assert_eq!(b, vec![10, 20, 30]);
    Ok(())
}
