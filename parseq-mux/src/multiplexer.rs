// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Producer registration and the multiplexer state machine.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use parseq_core::{EngineError, Result};

use crate::enumeration::{ActiveProducer, MuxStream};
use crate::logging::*;
use crate::options::MuxOptions;

pub(crate) type ProducerStream<T> = BoxStream<'static, Result<T>>;
pub(crate) type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type Factory<T> = Box<dyn Fn() -> ProducerStream<T> + Send + Sync>;

/// Lifecycle of a multiplexer. Transitions are one-way:
/// `Open → Frozen → Drained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxState {
    /// Producers may still be registered and unregistered.
    Open,
    /// An enumeration exists; the producer set is immutable.
    Frozen,
    /// An enumeration consumed every producer.
    Drained,
}

enum SourceCell<T> {
    /// A stream registered directly; consumable by exactly one enumeration.
    OneShot(Mutex<Option<ProducerStream<T>>>),
    /// A factory producing a fresh stream per enumeration.
    Factory(Factory<T>),
}

struct Binding<T> {
    name: Arc<str>,
    source: SourceCell<T>,
    predicate: Option<Predicate<T>>,
}

impl<T> Binding<T> {
    fn instantiate(&self) -> Result<ProducerStream<T>> {
        match &self.source {
            SourceCell::OneShot(cell) => {
                cell.lock()
                    .take()
                    .ok_or_else(|| EngineError::ProducerConsumed {
                        name: self.name.to_string(),
                    })
            }
            SourceCell::Factory(factory) => Ok(factory()),
        }
    }
}

pub(crate) struct Shared<T> {
    state: Mutex<MuxState>,
    bindings: Mutex<Vec<Binding<T>>>,
}

impl<T> Shared<T> {
    pub(crate) fn mark_drained(&self) {
        let mut state = self.state.lock();
        if *state == MuxState::Frozen {
            *state = MuxState::Drained;
        }
    }
}

/// Fans in any number of named async producers into one sequence.
///
/// Producers are registered while the multiplexer is [`MuxState::Open`]; the
/// first enumeration freezes the set. Each enumeration materializes its own
/// view of the frozen producers, so factory-registered producers support
/// multiple concurrent enumerations.
///
/// # Example
///
/// ```rust
/// use parseq_mux::Multiplexer;
/// use futures::{stream, StreamExt};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> parseq_core::Result<()> {
/// let mux = Multiplexer::new();
/// mux.register("evens", stream::iter(vec![0, 2, 4]))?;
/// mux.register("odds", stream::iter(vec![1, 3, 5]))?;
///
/// let merged: Vec<_> = mux.enumerate()?.collect().await;
/// assert_eq!(merged.len(), 6);
/// # Ok(())
/// # }
/// ```
pub struct Multiplexer<T> {
    shared: Arc<Shared<T>>,
    options: MuxOptions,
}

impl<T: Send + 'static> Multiplexer<T> {
    /// An empty multiplexer with default options.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MuxState::Open),
                bindings: Mutex::new(Vec::new()),
            }),
            options: MuxOptions::default(),
        }
    }

    /// Set the options used by [`enumerate`](Self::enumerate).
    #[must_use]
    pub fn with_options(mut self, options: MuxOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a producer for a single enumeration.
    ///
    /// # Errors
    ///
    /// `DuplicateProducer` if the name is taken, `EnumerationInProgress` if
    /// the producer set is already frozen.
    pub fn register<S>(&self, name: impl Into<String>, source: S) -> Result<()>
    where
        S: Stream<Item = T> + Send + 'static,
    {
        self.register_binding(name.into(), wrap_infallible(source), None)
    }

    /// Register a producer with a predicate. Items rejected by the predicate
    /// never reach the consumer and do not count for fairness.
    pub fn register_filtered<S, P>(
        &self,
        name: impl Into<String>,
        source: S,
        predicate: P,
    ) -> Result<()>
    where
        S: Stream<Item = T> + Send + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.register_binding(name.into(), wrap_infallible(source), Some(Arc::new(predicate)))
    }

    /// Register a producer whose items may themselves be failures.
    pub fn register_results<S>(&self, name: impl Into<String>, source: S) -> Result<()>
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        self.register_binding(
            name.into(),
            SourceCell::OneShot(Mutex::new(Some(source.boxed()))),
            None,
        )
    }

    /// Register a re-enumerable producer: the factory runs once per
    /// enumeration, so concurrent enumerations each get a fresh stream.
    pub fn register_with<F, S>(&self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        self.register_binding(
            name.into(),
            SourceCell::Factory(Box::new(move || factory().map(Ok).boxed())),
            None,
        )
    }

    /// Remove a producer by name. Returns whether the name was present.
    ///
    /// # Errors
    ///
    /// `EnumerationInProgress` if the producer set is already frozen.
    pub fn unregister(&self, name: &str) -> Result<bool> {
        let state = self.shared.state.lock();
        if *state != MuxState::Open {
            return Err(EngineError::EnumerationInProgress);
        }
        let mut bindings = self.shared.bindings.lock();
        let before = bindings.len();
        bindings.retain(|binding| &*binding.name != name);
        Ok(bindings.len() < before)
    }

    /// Begin an enumeration with the multiplexer's options, freezing the
    /// producer set.
    ///
    /// # Errors
    ///
    /// `ProducerConsumed` if a one-shot producer was already claimed by an
    /// earlier enumeration.
    pub fn enumerate(&self) -> Result<MuxStream<T>> {
        self.enumerate_with(self.options.clone())
    }

    /// Begin an enumeration with explicit options.
    pub fn enumerate_with(&self, options: MuxOptions) -> Result<MuxStream<T>> {
        {
            let mut state = self.shared.state.lock();
            if *state == MuxState::Open {
                *state = MuxState::Frozen;
                debug!("multiplexer frozen on first enumeration");
            }
        }

        let bindings = self.shared.bindings.lock();
        let mut producers = Vec::with_capacity(bindings.len());
        for binding in bindings.iter() {
            producers.push(ActiveProducer::new(
                Arc::clone(&binding.name),
                binding.instantiate()?,
                binding.predicate.clone(),
            ));
        }

        Ok(MuxStream::new(producers, options, Arc::clone(&self.shared)))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MuxState {
        *self.shared.state.lock()
    }

    /// Names of the currently registered producers, in registration order.
    pub fn producer_names(&self) -> Vec<String> {
        self.shared
            .bindings
            .lock()
            .iter()
            .map(|binding| binding.name.to_string())
            .collect()
    }

    fn register_binding(
        &self,
        name: String,
        source: SourceCell<T>,
        predicate: Option<Predicate<T>>,
    ) -> Result<()> {
        let state = self.shared.state.lock();
        if *state != MuxState::Open {
            return Err(EngineError::EnumerationInProgress);
        }

        let mut bindings = self.shared.bindings.lock();
        if bindings.iter().any(|binding| binding.name.as_ref() == name.as_str()) {
            return Err(EngineError::DuplicateProducer { name });
        }
        bindings.push(Binding {
            name: name.into(),
            source,
            predicate,
        });
        Ok(())
    }
}

impl<T: Send + 'static> Default for Multiplexer<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap_infallible<T, S>(source: S) -> SourceCell<T>
where
    T: Send + 'static,
    S: Stream<Item = T> + Send + 'static,
{
    SourceCell::OneShot(Mutex::new(Some(source.map(Ok).boxed())))
}
