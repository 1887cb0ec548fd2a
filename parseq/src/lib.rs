// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # parseq
//!
//! An asynchronous parallel query engine over lazy sequences, with
//! bounded-concurrency execution, order preservation, composable
//! cancellation, partial-failure policies, and fair fan-in from multiple
//! named producers.
//!
//! ## Overview
//!
//! parseq builds on the Rust async ecosystem (tokio, futures) and offers two
//! entry points:
//!
//! - [`ParallelQuery`] / [`AsParallel`]: lazy, chainable operators (`map`,
//!   `filter`, `flat_map`, `take`) that run user async functions under a
//!   concurrency ceiling, optionally reassembling results into source order.
//! - [`Multiplexer`]: fan in any number of named async producers into one
//!   sequence under a fairness policy and an error policy. The merged
//!   sequence can itself be fed back into a query.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parseq::prelude::*;
//! use futures::stream;
//!
//! #[tokio::main]
//! async fn main() -> parseq::Result<()> {
//!     let doubled = stream::iter(0..100)
//!         .as_parallel()
//!         .with_max_concurrency(4)
//!         .map(|x| async move { x * 2 })
//!         .to_list()
//!         .await?;
//!
//!     assert_eq!(doubled.len(), 100);
//!     Ok(())
//! }
//! ```

// Re-export core types
pub use parseq_core::{
    compose, CancellationScope, CancellationToken, EngineError, ErrorEvent, ErrorOrigin,
    ErrorSink, ExecutionMode, ExecutionSettings, Item, MergeMode, MetricsSnapshot, NullSink,
    PipelineMetrics, Result, TracingSink,
};

// Re-export the query layer
pub use parseq_query::{AsParallel, ParallelQuery, QueryStream};

// Re-export the multiplexer
pub use parseq_mux::{ErrorMode, Fairness, Multiplexer, MuxOptions, MuxState, MuxStream};

/// Prelude module for convenient imports
pub mod prelude {
    pub use parseq_core::{
        CancellationToken, EngineError, ErrorSink, ExecutionMode, ExecutionSettings, MergeMode,
        Result,
    };
    pub use parseq_mux::{ErrorMode, Fairness, Multiplexer, MuxOptions};
    pub use parseq_query::{AsParallel, ParallelQuery};
}
