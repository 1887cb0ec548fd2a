// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use futures::{Stream, StreamExt};
use parseq_core::EngineError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Creates a push-style test channel: send plain values, read them back as a
/// stream.
///
/// Dropping the sender ends the stream.
pub fn test_channel<T: Send + 'static>(
) -> (UnboundedSender<T>, impl Stream<Item = T> + Send + 'static) {
    let (tx, rx) = unbounded_channel();
    (tx, UnboundedReceiverStream::new(rx))
}

/// Collects every `Ok` value from a pipeline stream, panicking on the first
/// error.
///
/// # Panics
///
/// Panics if the stream yields an `Err` or takes longer than 10 seconds.
pub async fn collect_ok<T, S>(stream: S) -> Vec<T>
where
    S: Stream<Item = Result<T, EngineError>>,
{
    let gather = async {
        let mut values = Vec::new();
        futures::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(value) => values.push(value),
                Err(error) => panic!("expected a value but the stream failed: {error}"),
            }
        }
        values
    };
    tokio::time::timeout(Duration::from_secs(10), gather)
        .await
        .expect("stream did not complete within 10s")
}

/// Pulls the next item from a stream, panicking if none arrives in time.
///
/// # Panics
///
/// Panics if the stream ends or nothing arrives within `timeout_ms`.
pub async fn expect_next<T, S>(stream: &mut S, timeout_ms: u64) -> T
where
    S: Stream<Item = T> + Unpin,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), stream.next()).await {
        Ok(Some(item)) => item,
        Ok(None) => panic!("expected an item but the stream ended"),
        Err(_) => panic!("no item received within {timeout_ms}ms"),
    }
}
