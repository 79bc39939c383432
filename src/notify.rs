//! Notify module delivers coalesced, asynchronous change notifications.
//!
//! Every mutation enqueues one event per affected path before it returns.
//! At most one background worker drains the queue at any time: enqueueing
//! into an idle dispatcher starts a worker, enqueueing into a busy one does
//! not — the running worker only stops once the queue is empty at the
//! moment it checks, so it picks up anything enqueued meanwhile. The queue
//! and the in-flight flag live under a single mutex, so there is no window
//! between "flag checked" and "queue drained" for an event to be stranded
//! in.
//!
//! Subscriber callbacks run on the worker thread, never on the mutating
//! caller's thread. A panicking subscriber is caught, logged, and skipped;
//! it never stops drainage of the remaining queue.

use crate::path::TreePath;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{trace, warn};

/// Identifier handed out by [`ChangeDispatcher::subscribe`], used to
/// unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&TreePath) + Send + Sync>;

struct DispatchState {
    queue: VecDeque<TreePath>,
    draining: bool,
}

struct DispatchInner {
    state: Mutex<DispatchState>,
    idle: Condvar,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: Mutex<u64>,
}

/// Queue of path-change events with a single-flight background drain loop.
#[derive(Clone)]
pub struct ChangeDispatcher {
    inner: Arc<DispatchInner>,
}

impl Default for ChangeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeDispatcher {
    /// Creates an idle dispatcher with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                state: Mutex::new(DispatchState {
                    queue: VecDeque::new(),
                    draining: false,
                }),
                idle: Condvar::new(),
                subscribers: Mutex::new(Vec::new()),
                next_id: Mutex::new(0),
            }),
        }
    }

    /// Registers a callback invoked once per changed path.
    ///
    /// Callbacks run on the dispatcher's worker thread. A panic inside a
    /// callback is isolated: it is logged and the remaining events (and
    /// subscribers) still run.
    pub fn subscribe(&self, callback: impl Fn(&TreePath) + Send + Sync + 'static) -> SubscriptionId {
        let id = {
            let mut next = self.inner.next_id.lock();
            *next += 1;
            SubscriptionId(*next)
        };
        self.inner
            .subscribers
            .lock()
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes a previously registered callback. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.subscribers.lock().retain(|(sid, _)| *sid != id);
    }

    /// Enqueues one event per path and ensures a drain worker is running.
    pub fn notify(&self, paths: Vec<TreePath>) {
        if paths.is_empty() {
            return;
        }
        let mut state = self.inner.state.lock();
        trace!(events = paths.len(), "enqueueing change notifications");
        state.queue.extend(paths);
        if !state.draining {
            state.draining = true;
            let inner = Arc::clone(&self.inner);
            let spawned = thread::Builder::new()
                .name("canopy-dispatch".to_string())
                .spawn(move || Self::drain(inner));
            if let Err(e) = spawned {
                // Nobody will drain; undo the claim so a later notify retries.
                state.draining = false;
                warn!("failed to spawn dispatch worker: {e}");
            }
        }
    }

    fn drain(inner: Arc<DispatchInner>) {
        loop {
            let next = {
                let mut state = inner.state.lock();
                match state.queue.pop_front() {
                    Some(path) => path,
                    None => {
                        state.draining = false;
                        inner.idle.notify_all();
                        return;
                    }
                }
            };

            let subscribers: Vec<Subscriber> = inner
                .subscribers
                .lock()
                .iter()
                .map(|(_, s)| Arc::clone(s))
                .collect();
            for subscriber in subscribers {
                if catch_unwind(AssertUnwindSafe(|| subscriber(&next))).is_err() {
                    warn!(path = %next, "change subscriber panicked; discarding");
                }
            }
        }
    }

    /// Blocks until the queue is empty and no worker is in flight.
    ///
    /// Returns `false` if the timeout elapses first. Primarily useful in
    /// tests and shutdown paths; delivery normally needs no coordination.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let mut state = self.inner.state.lock();
        while state.draining || !state.queue.is_empty() {
            if self.inner.idle.wait_for(&mut state, timeout).timed_out() {
                return false;
            }
        }
        true
    }
}
