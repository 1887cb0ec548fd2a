// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Test helpers shared by the parseq crates: push-style channels, timed and
//! never-yielding sources, an error sink that records every event, and
//! unwrap helpers that keep assertions short.

pub mod helpers;
pub mod sink;
pub mod sources;

pub use helpers::{collect_ok, expect_next, test_channel};
pub use sink::CollectingSink;
pub use sources::{never_stream, ticking_stream};
