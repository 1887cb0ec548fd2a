// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! One enumeration of a frozen producer set.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parseq_core::cancellation::CancelledOwned;
use parseq_core::{EngineError, ErrorEvent, ErrorSink, Result};

use crate::logging::*;
use crate::multiplexer::{Predicate, ProducerStream, Shared};
use crate::options::{ErrorMode, Fairness, MuxOptions};

pub(crate) struct ActiveProducer<T> {
    name: Arc<str>,
    stream: ProducerStream<T>,
    predicate: Option<Predicate<T>>,
}

impl<T> ActiveProducer<T> {
    pub(crate) fn new(
        name: Arc<str>,
        stream: ProducerStream<T>,
        predicate: Option<Predicate<T>>,
    ) -> Self {
        Self {
            name,
            stream,
            predicate,
        }
    }
}

/// The merged output of one enumeration.
///
/// Holds its own view of the frozen producer set: ring position and the set
/// of still-live producers are local to this enumeration. Per-producer order
/// is preserved; cross-producer interleaving follows the fairness rule.
pub struct MuxStream<T> {
    producers: Vec<ActiveProducer<T>>,
    cursor: usize,
    fairness: Fairness,
    error_mode: ErrorMode,
    cancel_wait: Option<CancelledOwned>,
    sink: Arc<dyn ErrorSink>,
    shared: Arc<Shared<T>>,
    done: bool,
}

impl<T: Send + 'static> MuxStream<T> {
    pub(crate) fn new(
        producers: Vec<ActiveProducer<T>>,
        options: MuxOptions,
        shared: Arc<Shared<T>>,
    ) -> Self {
        Self {
            producers,
            cursor: 0,
            fairness: options.fairness,
            error_mode: options.error_mode,
            cancel_wait: options
                .cancellation
                .as_ref()
                .map(|token| token.cancelled_owned()),
            sink: options.sink,
            shared,
            done: false,
        }
    }

    /// Names of the producers still live in this enumeration.
    pub fn live_producers(&self) -> Vec<String> {
        self.producers
            .iter()
            .map(|producer| producer.name.to_string())
            .collect()
    }

    fn remove_producer(&mut self, idx: usize) {
        self.producers.remove(idx);
        if self.producers.is_empty() {
            self.cursor = 0;
        } else {
            if self.cursor > idx {
                self.cursor -= 1;
            }
            self.cursor %= self.producers.len();
        }
    }

    fn abort(&mut self) {
        // Dropping the producer streams is the cooperative "cancel and
        // drain": nothing polls them again
        self.producers.clear();
        self.done = true;
    }
}

impl<T: Send + 'static> Stream for MuxStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        // The consumer token wins over any producer readiness; polling the
        // stored wait keeps its wake registration alive across polls
        if let Some(wait) = this.cancel_wait.as_mut() {
            if Pin::new(wait).poll(cx).is_ready() {
                this.abort();
                return Poll::Ready(Some(Err(EngineError::cancelled(
                    "multiplexer enumeration cancelled",
                ))));
            }
        }

        'scan: loop {
            let count = this.producers.len();
            if count == 0 {
                this.done = true;
                this.shared.mark_drained();
                return Poll::Ready(None);
            }

            for offset in 0..count {
                let idx = (this.cursor + offset) % count;
                loop {
                    match this.producers[idx].stream.as_mut().poll_next(cx) {
                        Poll::Ready(Some(Ok(value))) => {
                            let keep = this.producers[idx]
                                .predicate
                                .as_ref()
                                .map_or(true, |predicate| predicate(&value));
                            if keep {
                                if this.fairness == Fairness::RoundRobin {
                                    this.cursor = (idx + 1) % count;
                                }
                                return Poll::Ready(Some(Ok(value)));
                            }
                            // Rejected by the predicate: the producer keeps
                            // its turn, ask it again
                        }
                        Poll::Ready(Some(Err(cause))) => {
                            let name = Arc::clone(&this.producers[idx].name);
                            let wrapped =
                                EngineError::source_failure(name.to_string(), cause);
                            match this.error_mode {
                                ErrorMode::FailFast => {
                                    warn!("source '{name}' failed, aborting enumeration");
                                    this.abort();
                                    return Poll::Ready(Some(Err(wrapped)));
                                }
                                ErrorMode::ContinueOnError => {
                                    this.sink
                                        .report(ErrorEvent::source(name.to_string(), wrapped));
                                    this.remove_producer(idx);
                                    continue 'scan;
                                }
                            }
                        }
                        Poll::Ready(None) => {
                            debug!("producer '{}' completed", this.producers[idx].name);
                            this.remove_producer(idx);
                            continue 'scan;
                        }
                        Poll::Pending => break,
                    }
                }
            }

            // Every live producer is pending and all their wakers (plus the
            // token's) are registered
            return Poll::Pending;
        }
    }
}
