use crate::runtime::host::Callback;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Longest time an idle worker sleeps before re-checking the local queues.
const PARK_TIMEOUT: Duration = Duration::from_millis(1);

/// Global callback injector for the thread-pool host.
///
/// The injector is used as a centralized FIFO queue where callbacks deferred
/// from outside the pool are pushed before being picked up by a worker.
///
/// It also coordinates worker parking and waking using a condition
/// variable, allowing workers to sleep when no work is available.
pub(crate) struct Injector {
    /// Queue holding globally injected callbacks.
    queue: Mutex<VecDeque<Callback>>,

    /// Condition variable used to wake parked workers.
    condvar: Condvar,

    /// Indicates whether the pool is shutting down.
    shutdown: AtomicBool,
}

impl Injector {
    /// Creates a new empty injector.
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Signals shutdown and wakes all parked workers.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);

        let _queue = self.queue.lock();
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Pushes a callback into the global injector and wakes one worker.
    pub(crate) fn push(&self, callback: Callback) {
        self.queue.lock().push_back(callback);
        self.condvar.notify_one();
    }

    /// Wakes one parked worker without queueing anything.
    ///
    /// Used after a worker pushed onto its own local queue, so that an idle
    /// sibling can come and steal.
    pub(crate) fn notify(&self) {
        self.condvar.notify_one();
    }

    /// Parks the current worker until work becomes available, a shutdown
    /// signal is received or the park timeout elapses.
    ///
    /// Local queue pushes only `notify` without holding the injector lock, so
    /// the timed wait bounds how long such a wakeup can be missed.
    pub(crate) fn park(&self) {
        let mut queue = self.queue.lock();

        if self.is_shutdown() || !queue.is_empty() {
            return;
        }

        let _ = self.condvar.wait_for(&mut queue, PARK_TIMEOUT);
    }

    /// Takes the oldest callback from the injector.
    pub(crate) fn steal(&self) -> Option<Callback> {
        self.queue.lock().pop_front()
    }

    /// Empties the injector, handing the callbacks back so they can be
    /// dropped outside of the lock.
    pub(crate) fn drain(&self) -> Vec<Callback> {
        self.queue.lock().drain(..).collect()
    }
}
