// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Order-preserving reassembly of out-of-order worker completions.
//!
//! Workers publish [`Arrival`] messages to a single coordinator task; the
//! coordinator feeds them through a [`Resequencer`], which buffers entries in
//! a min-heap until the next expected source position is available. The heap
//! is touched by the coordinator only, so no locking is needed.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Sub-position that sorts an end-of-group sentinel after every real part.
const GROUP_END: u64 = u64::MAX;

/// One completion event published by a worker.
#[derive(Debug)]
pub enum Arrival<U> {
    /// The single completion for a map or filter item: `Some` forwards the
    /// value, `None` records a filter drop so the cursor can advance.
    Whole {
        /// Source index of the completed item.
        index: u64,
        /// The produced value, or `None` for a drop.
        output: Option<U>,
    },
    /// One sub-item produced by a flat-map worker.
    Part {
        /// Source index of the parent item.
        index: u64,
        /// Position within the parent's sub-sequence.
        sub: u64,
        /// The sub-item.
        value: U,
    },
    /// End of a flat-map worker's sub-sequence.
    PartsEnd {
        /// Source index of the parent item.
        index: u64,
    },
}

#[derive(Debug)]
enum EntryKind<U> {
    Whole(Option<U>),
    Part(U),
    PartsEnd,
}

#[derive(Debug)]
struct Entry<U> {
    index: u64,
    sub: u64,
    kind: EntryKind<U>,
}

impl<U> Entry<U> {
    const fn key(&self) -> (u64, u64) {
        (self.index, self.sub)
    }
}

impl<U> PartialEq for Entry<U> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<U> Eq for Entry<U> {}

impl<U> PartialOrd for Entry<U> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<U> Ord for Entry<U> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-heap resequencer keyed by `(index, sub)`.
///
/// Worst-case occupancy is `max_concurrency + buffer_size` entries: every
/// fast worker parked behind one slow leader. That is the designed memory
/// cost of order preservation.
#[derive(Debug)]
pub struct Resequencer<U> {
    heap: BinaryHeap<Reverse<Entry<U>>>,
    next_index: u64,
    next_sub: u64,
}

impl<U> Resequencer<U> {
    /// A resequencer expecting source index 0 first.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_index: 0,
            next_sub: 0,
        }
    }

    /// Buffer one completion event.
    pub fn push(&mut self, arrival: Arrival<U>) {
        let entry = match arrival {
            Arrival::Whole { index, output } => Entry {
                index,
                sub: 0,
                kind: EntryKind::Whole(output),
            },
            Arrival::Part { index, sub, value } => Entry {
                index,
                sub,
                kind: EntryKind::Part(value),
            },
            Arrival::PartsEnd { index } => Entry {
                index,
                sub: GROUP_END,
                kind: EntryKind::PartsEnd,
            },
        };
        self.heap.push(Reverse(entry));
    }

    /// Move every value that is now in source order into `ready`.
    pub fn drain_ready(&mut self, ready: &mut Vec<U>) {
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.index != self.next_index {
                break;
            }
            match head.kind {
                EntryKind::Whole(_) => {
                    let Reverse(entry) = self.heap.pop().expect("peeked entry");
                    if let EntryKind::Whole(Some(value)) = entry.kind {
                        ready.push(value);
                    }
                    self.next_index += 1;
                    self.next_sub = 0;
                }
                EntryKind::Part(_) => {
                    if head.sub != self.next_sub {
                        break;
                    }
                    let Reverse(entry) = self.heap.pop().expect("peeked entry");
                    if let EntryKind::Part(value) = entry.kind {
                        ready.push(value);
                    }
                    self.next_sub += 1;
                }
                EntryKind::PartsEnd => {
                    // Sorts after every real part of this index, so the whole
                    // group has already drained
                    let _ = self.heap.pop();
                    self.next_index += 1;
                    self.next_sub = 0;
                }
            }
        }
    }

    /// Number of buffered entries still waiting for their turn.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }
}

impl<U> Default for Resequencer<U> {
    fn default() -> Self {
        Self::new()
    }
}
