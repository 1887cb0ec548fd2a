// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use parseq_core::{CancellationToken, ExecutionMode, MergeMode};
use parseq_query::ParallelQuery;

#[test]
fn with_calls_compose_pointwise_and_operators_carry_settings_forward() {
    // Arrange
    let first_token = CancellationToken::new();
    let second_token = CancellationToken::new();

    // Act: a with_* chain followed by operator methods
    let query = ParallelQuery::from_iter(0..10)
        .with_max_concurrency(7)
        .with_buffer_size(64)
        .with_order_preservation(false)
        .with_execution_mode(ExecutionMode::ForceParallel)
        .with_merge_mode(MergeMode::FullyBuffered)
        .continue_on_error()
        .with_timeout(Duration::from_secs(9))
        .with_cancellation(first_token)
        .with_cancellation(second_token)
        .map(|x| async move { x })
        .filter(|x| async move { x >= 0 });

    // Assert: runtime settings equal the point-wise composition
    let settings = query.settings();
    assert_eq!(settings.max_concurrency, 7);
    assert_eq!(settings.buffer_size, 64);
    assert!(!settings.preserve_order);
    assert_eq!(settings.execution_mode, ExecutionMode::ForceParallel);
    assert_eq!(settings.merge_mode, MergeMode::FullyBuffered);
    assert!(settings.continue_on_error);
    assert_eq!(settings.timeout, Some(Duration::from_secs(9)));
    assert_eq!(settings.cancellations.len(), 2);
}

#[test]
fn chained_timeouts_keep_the_tightest_deadline() {
    let query = ParallelQuery::from_iter(0..10)
        .with_timeout(Duration::from_secs(5))
        .with_timeout(Duration::from_secs(2))
        .with_timeout(Duration::from_secs(30));

    assert_eq!(query.settings().timeout, Some(Duration::from_secs(2)));
}

#[test]
fn each_with_call_updates_a_single_field() {
    let base = ParallelQuery::from_iter(0..10);
    let defaults = base.settings().clone();

    let tuned = base.with_max_concurrency(3);
    let settings = tuned.settings();

    assert_eq!(settings.max_concurrency, 3);
    assert_eq!(settings.buffer_size, defaults.buffer_size);
    assert_eq!(settings.preserve_order, defaults.preserve_order);
    assert_eq!(settings.merge_mode, defaults.merge_mode);
    assert_eq!(settings.continue_on_error, defaults.continue_on_error);
    assert_eq!(settings.timeout, defaults.timeout);
}

#[test]
#[should_panic(expected = "max_concurrency")]
fn zero_concurrency_is_rejected_at_configuration_time() {
    let _ = ParallelQuery::from_iter(0..10).with_max_concurrency(0);
}

#[test]
#[should_panic(expected = "buffer_size")]
fn undersized_buffer_is_rejected_at_configuration_time() {
    let _ = ParallelQuery::from_iter(0..10).with_buffer_size(2);
}
