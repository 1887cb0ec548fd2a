// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Bounded-concurrency execution of user async operations over a lazy
//! source, with optional source-order reassembly.
//!
//! The stage functions in [`map`], [`filter`] and [`flat_map`] all run on the
//! same worker pool: a dispatcher pulling the source under a semaphore, a set
//! of spawned workers, and a coordinator that reorders completions when
//! `preserve_order` is set. [`take::TakeStream`] cuts a running pipeline
//! short by firing the effective cancellation token.

#[macro_use]
mod logging;
pub mod filter;
pub mod flat_map;
pub mod map;
pub mod pool;
pub mod reorder;
pub mod take;

pub use filter::{filter_stage, try_filter_stage};
pub use flat_map::{flat_map_stage, try_flat_map_stage};
pub use map::{map_stage, try_map_stage};
pub use pool::{StageContext, WorkerEnv};
pub use take::TakeStream;
