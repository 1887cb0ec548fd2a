// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Lazy, chainable query operators composing the parseq execution engine.
//!
//! A [`ParallelQuery`] is a description: nothing runs until the query is
//! pulled through [`ParallelQuery::into_stream`] or
//! [`ParallelQuery::to_list`]. Every `with_*` call returns a new query whose
//! settings differ in exactly one field; operator methods carry settings
//! forward unchanged.
//!
//! ```rust,no_run
//! use parseq_query::AsParallel;
//! use futures::stream;
//!
//! # async fn example() -> parseq_core::Result<()> {
//! let doubled = stream::iter(0..10)
//!     .as_parallel()
//!     .with_max_concurrency(4)
//!     .map(|x| async move { x * 2 })
//!     .to_list()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod query;
pub mod source;
pub mod stream;

pub use query::ParallelQuery;
pub use source::AsParallel;
pub use stream::QueryStream;
