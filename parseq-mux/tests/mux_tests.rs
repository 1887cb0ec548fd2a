// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use futures::{stream, StreamExt};
use parseq_core::EngineError;
use parseq_mux::Multiplexer;
use parseq_test_utils::{collect_ok, expect_next, test_channel, ticking_stream};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_timed_producers_merge_completely_with_per_producer_order() -> anyhow::Result<()> {
    // Arrange: a fast producer and a slow one
    let mux = Multiplexer::new();
    mux.register(
        "fast",
        ticking_stream(vec![100, 101, 102], Duration::from_millis(5)),
    )?;
    mux.register(
        "slow",
        ticking_stream(vec![200, 201, 202], Duration::from_millis(20)),
    )?;

    // Act
    let values = collect_ok(mux.enumerate()?).await;

    // Assert: all six items, each producer's items in its own order
    assert_eq!(values.len(), 6);
    let fast: Vec<_> = values.iter().copied().filter(|v| *v < 200).collect();
    let slow: Vec<_> = values.iter().copied().filter(|v| *v >= 200).collect();
    assert_eq!(fast, vec![100, 101, 102]);
    assert_eq!(slow, vec![200, 201, 202]);
    Ok(())
}

#[tokio::test]
async fn duplicate_names_are_rejected() -> anyhow::Result<()> {
    // Arrange
    let mux = Multiplexer::new();
    mux.register("orders", stream::iter(vec![1]))?;

    // Act
    let outcome = mux.register("orders", stream::iter(vec![2]));

    // Assert
    assert!(matches!(
        outcome,
        Err(EngineError::DuplicateProducer { name }) if name == "orders"
    ));
    Ok(())
}

#[tokio::test]
async fn unregister_reports_whether_the_name_was_present() -> anyhow::Result<()> {
    // Arrange
    let mux = Multiplexer::new();
    mux.register("present", stream::iter(vec![1]))?;

    // Act + Assert
    assert!(mux.unregister("present")?);
    assert!(!mux.unregister("absent")?);
    Ok(())
}

#[tokio::test]
async fn an_empty_multiplexer_enumerates_to_an_empty_stream() -> anyhow::Result<()> {
    let mux = Multiplexer::<i32>::new();
    let values = collect_ok(mux.enumerate()?).await;
    assert!(values.is_empty());
    Ok(())
}

#[tokio::test]
async fn channel_backed_producers_deliver_as_items_arrive() -> anyhow::Result<()> {
    // Arrange: producers driven by live channels
    let (first_tx, first_rx) = test_channel();
    let (second_tx, second_rx) = test_channel();
    let mux = Multiplexer::new();
    mux.register("first", first_rx)?;
    mux.register("second", second_rx)?;

    let mut merged = mux.enumerate()?;

    // Act + Assert: whichever producer has data wins the race
    first_tx.send(1)?;
    assert_eq!(expect_next(&mut merged, 500).await?, 1);

    second_tx.send(2)?;
    assert_eq!(expect_next(&mut merged, 500).await?, 2);

    drop(first_tx);
    drop(second_tx);
    assert!(merged.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn items_are_delivered_exactly_once() -> anyhow::Result<()> {
    // Arrange
    let mux = Multiplexer::new();
    mux.register("a", stream::iter(vec![1, 2, 3]))?;
    mux.register("b", stream::iter(vec![4, 5, 6]))?;

    // Act
    let mut values = collect_ok(mux.enumerate()?).await;

    // Assert
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    Ok(())
}
