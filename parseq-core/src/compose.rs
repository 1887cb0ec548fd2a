// Copyright 2026 parseq contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Composite cancellation: link several parent tokens and an optional
//! deadline into one effective token, with deterministic release.

use std::time::Duration;

use crate::cancellation::{CancellationToken, Registration};

/// Derive one effective token from any number of parents plus an optional
/// timeout.
///
/// The composite fires when any parent fires or the timer elapses. A
/// pre-cancelled parent makes the composite start cancelled. Passing no
/// parents and no timeout yields an always-active sentinel.
///
/// The returned [`CancellationScope`] must live for as long as the composite
/// is in use; dropping (or explicitly releasing) it stops the timer and
/// severs the links to the parents without cancelling them.
///
/// Composition is associative: a composite token may itself be passed as a
/// parent to a later `compose` call, and earlier parents keep firing through
/// the chain.
///
/// # Example
///
/// ```
/// use parseq_core::{compose, CancellationToken};
/// use std::time::Duration;
///
/// # async fn example() {
/// let user = CancellationToken::new();
/// let (effective, scope) = compose(&[user.clone()], Some(Duration::from_secs(5)));
///
/// user.cancel();
/// assert!(effective.is_cancelled());
///
/// drop(scope); // timer stopped, links severed; `user` unaffected
/// # }
/// ```
pub fn compose(
    parents: &[CancellationToken],
    timeout: Option<Duration>,
) -> (CancellationToken, CancellationScope) {
    let composite = CancellationToken::new();

    let mut links = Vec::with_capacity(parents.len());
    for parent in parents {
        let child = composite.clone();
        let registration = parent.on_cancelled(move || child.cancel());
        links.push((parent.clone(), registration));
    }

    let timer = match timeout {
        Some(deadline) if !deadline.is_zero() => {
            let child = composite.clone();
            Some(tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                child.cancel();
            }))
        }
        _ => None,
    };

    (composite, CancellationScope { links, timer })
}

/// Scoped release handle returned by [`compose`].
///
/// Releasing unregisters every parent link and aborts the timer task. It is
/// idempotent and also runs from `Drop`, so every exit path from the owning
/// scope releases the composite's resources.
#[derive(Debug)]
pub struct CancellationScope {
    links: Vec<(CancellationToken, Registration)>,
    timer: Option<tokio::task::JoinHandle<()>>,
}

impl CancellationScope {
    /// Sever parent links and stop the timer. Parents are not cancelled.
    pub fn release(&mut self) {
        for (parent, registration) in self.links.drain(..) {
            parent.unregister(registration);
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for CancellationScope {
    fn drop(&mut self) {
        self.release();
    }
}
