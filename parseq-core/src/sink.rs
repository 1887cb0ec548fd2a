// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Structured error reporting for continue-on-error pipelines.

use crate::error::EngineError;

/// Where a reported error came from.
#[derive(Debug, Clone, Default)]
pub struct ErrorOrigin {
    /// Producer name, when the item came through a multiplexer.
    pub source_name: Option<String>,
    /// Source index of the failing item, when known.
    pub index: Option<u64>,
}

/// A structured error event delivered to an [`ErrorSink`].
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    /// Error kind, one of the `kind::*` constants.
    pub kind: &'static str,
    /// Human-readable description.
    pub message: String,
    /// Origin of the failing item or producer.
    pub origin: ErrorOrigin,
    /// The underlying error, when available.
    pub cause: Option<EngineError>,
}

/// Kind labels carried by [`ErrorEvent`].
pub mod kind {
    /// A user-supplied async function failed.
    pub const USER_FUNCTION: &str = "user_function";
    /// A source producer failed.
    pub const SOURCE: &str = "source";
    /// A concurrent error observed after the pipeline already began failing.
    pub const SECONDARY: &str = "secondary";
}

impl ErrorEvent {
    /// Event for a user-function failure on the item at `index`.
    pub fn user_function(index: u64, cause: EngineError) -> Self {
        Self {
            kind: kind::USER_FUNCTION,
            message: cause.to_string(),
            origin: ErrorOrigin {
                source_name: None,
                index: Some(index),
            },
            cause: Some(cause),
        }
    }

    /// Event for a failing producer.
    pub fn source(name: impl Into<String>, cause: EngineError) -> Self {
        Self {
            kind: kind::SOURCE,
            message: cause.to_string(),
            origin: ErrorOrigin {
                source_name: Some(name.into()),
                index: None,
            },
            cause: Some(cause),
        }
    }

    /// Event for a concurrent error observed after fail-fast already fired.
    pub fn secondary(cause: EngineError) -> Self {
        Self {
            kind: kind::SECONDARY,
            message: cause.to_string(),
            origin: ErrorOrigin::default(),
            cause: Some(cause),
        }
    }
}

/// Receiver for structured error events.
///
/// Implementations must be thread-safe: the pool and the multiplexer report
/// from worker tasks.
pub trait ErrorSink: Send + Sync {
    /// Deliver one error event.
    fn report(&self, event: ErrorEvent);
}

/// Sink that discards every event. The default when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ErrorSink for NullSink {
    fn report(&self, _event: ErrorEvent) {}
}

/// Sink that logs each event through `tracing` at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, event: ErrorEvent) {
        tracing::warn!(
            kind = event.kind,
            source = event.origin.source_name.as_deref(),
            index = event.origin.index,
            "{}",
            event.message
        );
    }
}
