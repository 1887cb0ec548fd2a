// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Core types shared by every parseq crate.
//!
//! This crate holds the pieces the execution engine, the multiplexer and the
//! query layer all agree on: the [`Item`] envelope carried through pipelines,
//! the [`CancellationToken`] and its [`compose`] helper for deadline/cancel
//! linkage, [`ExecutionSettings`], the [`EngineError`] taxonomy, the
//! [`ErrorSink`] reporting interface and [`PipelineMetrics`].

pub mod cancellation;
pub mod compose;
pub mod error;
pub mod item;
pub mod metrics;
pub mod settings;
pub mod sink;

pub use cancellation::{CancellationToken, Registration};
pub use compose::{compose, CancellationScope};
pub use error::{EngineError, Result};
pub use item::Item;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use settings::{ExecutionMode, ExecutionSettings, MergeMode, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use sink::{ErrorEvent, ErrorOrigin, ErrorSink, NullSink, TracingSink};
