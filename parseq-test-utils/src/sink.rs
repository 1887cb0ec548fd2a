// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use parseq_core::{ErrorEvent, ErrorSink};

/// An [`ErrorSink`] that records every event for later assertions.
///
/// Share it with the pipeline through an `Arc` and inspect the recorded
/// events once the pipeline has completed.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ErrorEvent>>,
}

impl CollectingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event reported so far.
    pub fn events(&self) -> Vec<ErrorEvent> {
        self.events.lock().clone()
    }

    /// Number of events reported so far.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, event: ErrorEvent) {
        self.events.lock().push(event);
    }
}
