// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Observable cancellation signal.
//!
//! A [`CancellationToken`] can be queried, awaited, and asked to run a
//! callback when it fires. Callbacks can be unregistered again, which is what
//! lets [`compose`](crate::compose::compose) drop the linkage between a
//! composite token and its parents without cancelling anything.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use event_listener::{Event, EventListener};
use parking_lot::Mutex;

type Callback = Box<dyn FnOnce() + Send>;

/// Observable cancellation signal.
///
/// Cloning produces another handle to the same state. When `cancel()` is
/// called on any clone, all waiters on `cancelled()` are woken and all
/// registered callbacks run exactly once.
///
/// # Example
///
/// ```
/// use parseq_core::CancellationToken;
///
/// # async fn example() {
/// let token = CancellationToken::new();
/// let watcher = token.clone();
///
/// tokio::spawn(async move {
///     watcher.cancelled().await;
///     // tear down
/// });
///
/// token.cancel();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    event: Event,
    callbacks: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("cancelled", &self.cancelled)
            .finish_non_exhaustive()
    }
}

/// Handle to a callback registered with [`CancellationToken::on_cancelled`].
///
/// Pass it back to [`CancellationToken::unregister`] to remove the callback
/// before the token fires.
#[derive(Debug)]
pub struct Registration {
    id: u64,
}

impl CancellationToken {
    /// Create a new token in the active (not cancelled) state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                event: Event::new(),
                callbacks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Cancel the token, waking all waiters and running registered callbacks.
    ///
    /// Idempotent: only the first call runs callbacks.
    pub fn cancel(&self) {
        // Release so all writes preceding cancel() are visible to observers
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.event.notify(usize::MAX);

        // Run callbacks outside the lock; a callback may touch this token
        let pending = std::mem::take(&mut *self.inner.callbacks.lock());
        for (_, callback) in pending {
            callback();
        }
    }

    /// Check whether the token has been cancelled (non-blocking).
    ///
    /// # Example
    ///
    /// ```
    /// use parseq_core::CancellationToken;
    ///
    /// let token = CancellationToken::new();
    /// assert!(!token.is_cancelled());
    ///
    /// token.cancel();
    /// assert!(token.is_cancelled());
    /// ```
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Register a one-shot callback to run when the token fires.
    ///
    /// If the token is already cancelled the callback runs inline before this
    /// method returns. The returned [`Registration`] can be passed to
    /// [`unregister`](Self::unregister); unregistering a callback that has
    /// already run is a no-op.
    pub fn on_cancelled(&self, callback: impl FnOnce() + Send + 'static) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        if self.is_cancelled() {
            callback();
            return Registration { id };
        }

        self.inner.callbacks.lock().push((id, Box::new(callback)));

        // cancel() may have drained the list between the check and the push;
        // if so, run the straggler ourselves
        if self.is_cancelled() {
            let straggler = {
                let mut callbacks = self.inner.callbacks.lock();
                callbacks
                    .iter()
                    .position(|(entry_id, _)| *entry_id == id)
                    .map(|pos| callbacks.swap_remove(pos).1)
            };
            if let Some(callback) = straggler {
                callback();
            }
        }

        Registration { id }
    }

    /// Remove a previously registered callback without running it.
    pub fn unregister(&self, registration: Registration) {
        let mut callbacks = self.inner.callbacks.lock();
        if let Some(pos) = callbacks
            .iter()
            .position(|(entry_id, _)| *entry_id == registration.id)
        {
            callbacks.swap_remove(pos);
        }
    }

    /// Wait asynchronously until the token is cancelled.
    ///
    /// Resolves immediately if the token is already cancelled.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled {
            token: self,
            listener: None,
        }
    }

    /// Like [`cancelled`](Self::cancelled), but owns its token handle.
    ///
    /// Useful when the wait must be stored in a struct and polled across
    /// calls, keeping its wake registration alive between polls.
    pub fn cancelled_owned(&self) -> CancelledOwned {
        CancelledOwned {
            token: self.clone(),
            listener: None,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`CancellationToken::cancelled()`].
pub struct Cancelled<'a> {
    token: &'a CancellationToken,
    listener: Option<EventListener>,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // Fast path: already cancelled
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }

        if self.listener.is_none() {
            self.listener = Some(self.token.inner.event.listen());

            // Re-check after registering: cancel() may have fired between the
            // first check and listen()
            if self.token.is_cancelled() {
                return Poll::Ready(());
            }
        }

        match Pin::new(self.listener.as_mut().unwrap()).poll(cx) {
            Poll::Ready(()) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned by [`CancellationToken::cancelled_owned()`].
pub struct CancelledOwned {
    token: CancellationToken,
    listener: Option<EventListener>,
}

impl Future for CancelledOwned {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }

        if self.listener.is_none() {
            let listener = self.token.inner.event.listen();
            self.listener = Some(listener);
            if self.token.is_cancelled() {
                return Poll::Ready(());
            }
        }

        match Pin::new(self.listener.as_mut().unwrap()).poll(cx) {
            Poll::Ready(()) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}
