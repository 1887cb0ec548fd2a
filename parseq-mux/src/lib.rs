// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Unified stream multiplexer: fair fan-in of named async producers.
//!
//! A [`Multiplexer`] collects named producers while open, freezes on first
//! enumeration, and merges the producers into one sequence under a
//! [`Fairness`] rule and an [`ErrorMode`]. Every item of every producer is
//! delivered at most once and in that producer's own order; interleaving
//! across producers follows the fairness rule.

#[macro_use]
mod logging;
pub mod enumeration;
pub mod multiplexer;
pub mod options;

pub use enumeration::MuxStream;
pub use multiplexer::{Multiplexer, MuxState};
pub use options::{ErrorMode, Fairness, MuxOptions};
