// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::doc_markdown)]
//! Error types for the parseq engine.
//!
//! A single root [`EngineError`] covers every failure mode of the pipeline,
//! with one variant per kind. Cancellation is a terminal-but-expected signal
//! and carries its own variant so consumers can tell it apart from real
//! failures with [`EngineError::is_cancellation`].

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Root error type for all parseq operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A configuration value was rejected at build time.
    #[error("invalid configuration: {context}")]
    InvalidConfig {
        /// Description of the offending setting
        context: String,
    },

    /// The effective cancellation token fired, by user request, timeout, or
    /// early termination of the consumer.
    #[error("operation cancelled: {context}")]
    Cancelled {
        /// What triggered the cancellation
        context: String,
    },

    /// A user-supplied async function failed while processing an item.
    #[error("user function failed on item {index}")]
    UserFunction {
        /// Source index of the item being processed
        index: u64,
        /// Producer name, when the item came through a multiplexer
        producer: Option<String>,
        /// The user error
        #[source]
        cause: Cause,
    },

    /// A source producer failed while being enumerated.
    #[error("source '{name}' failed")]
    Source {
        /// Name of the failing producer
        name: String,
        /// The producer error
        #[source]
        cause: Cause,
    },

    /// A producer was registered under a name that is already taken.
    #[error("duplicate producer '{name}'")]
    DuplicateProducer {
        /// The colliding name
        name: String,
    },

    /// A multiplexer was mutated after its producer set was frozen.
    #[error("multiplexer is frozen: enumeration in progress")]
    EnumerationInProgress,

    /// A one-shot producer was asked for a second enumeration.
    #[error("producer '{name}' was already consumed by a previous enumeration")]
    ProducerConsumed {
        /// Name of the consumed producer
        name: String,
    },
}

impl EngineError {
    /// Create a cancellation error with the given context.
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled {
            context: context.into(),
        }
    }

    /// Create a configuration error with the given context.
    pub fn invalid_config(context: impl Into<String>) -> Self {
        Self::InvalidConfig {
            context: context.into(),
        }
    }

    /// Wrap a user-function failure with its item context.
    pub fn user_function(
        index: u64,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::UserFunction {
            index,
            producer: None,
            cause: Box::new(cause),
        }
    }

    /// Wrap a producer failure with the producer's name.
    pub fn source_failure(name: impl Into<String>, cause: Self) -> Self {
        Self::Source {
            name: name.into(),
            cause: Box::new(cause),
        }
    }

    /// `true` if this error is the expected cancellation signal rather than a
    /// real failure.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// `true` if this error is a synchronously raised invariant violation
    /// (never retried, never routed through an error sink).
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateProducer { .. }
                | Self::EnumerationInProgress
                | Self::ProducerConsumed { .. }
        )
    }
}

// Boxed causes cannot be cloned; degrade them to their rendered message so
// cloned errors stay useful in fan-out paths.
impl Clone for EngineError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidConfig { context } => Self::InvalidConfig {
                context: context.clone(),
            },
            Self::Cancelled { context } => Self::Cancelled {
                context: context.clone(),
            },
            Self::UserFunction {
                index,
                producer,
                cause,
            } => Self::UserFunction {
                index: *index,
                producer: producer.clone(),
                cause: cause.to_string().into(),
            },
            Self::Source { name, cause } => Self::Source {
                name: name.clone(),
                cause: cause.to_string().into(),
            },
            Self::DuplicateProducer { name } => Self::DuplicateProducer { name: name.clone() },
            Self::EnumerationInProgress => Self::EnumerationInProgress,
            Self::ProducerConsumed { name } => Self::ProducerConsumed { name: name.clone() },
        }
    }
}

/// Specialized `Result` for parseq operations.
pub type Result<T> = std::result::Result<T, EngineError>;
