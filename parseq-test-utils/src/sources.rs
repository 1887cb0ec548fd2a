// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use futures::Stream;

/// A source that emits each value after waiting `interval`, like a slow
/// producer.
pub fn ticking_stream<T: Send + 'static>(
    values: Vec<T>,
    interval: Duration,
) -> impl Stream<Item = T> + Send + 'static {
    async_stream::stream! {
        for value in values {
            tokio::time::sleep(interval).await;
            yield value;
        }
    }
}

/// A source that never yields and never ends — the tightest possible
/// generator for timeout tests.
pub fn never_stream<T: Send + 'static>() -> impl Stream<Item = T> + Send + 'static {
    futures::stream::pending()
}
