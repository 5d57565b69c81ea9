use crate::runtime::context::{CURRENT_LOCALS, CURRENT_WORKER_ID, enter_context};
use crate::runtime::executor::core::PoolShared;
use crate::runtime::host::{Callback, Host, run_callback};

use std::sync::Arc;

/// A worker thread of the thread-pool host.
///
/// A `Worker` runs deferred callbacks using a work-stealing strategy.
/// Each worker owns a local queue and cooperates with other workers to
/// balance load.
///
/// The execution order is:
/// 1. Pop from the local queue
/// 2. Steal from the global injector
/// 3. Steal from other workers
/// 4. Park if no work is available
pub(crate) struct Worker {
    /// Unique identifier of the worker.
    id: usize,

    shared: Arc<PoolShared>,
}

impl Worker {
    pub(crate) fn new(id: usize, shared: Arc<PoolShared>) -> Self {
        Self { id, shared }
    }

    /// Runs the worker loop until the pool shuts down.
    ///
    /// The host context, worker id and pool queues are installed once for
    /// the lifetime of the thread.
    pub(crate) fn run(self) {
        CURRENT_WORKER_ID.with(|id| *id.borrow_mut() = Some(self.id));
        CURRENT_LOCALS.with(|l| *l.borrow_mut() = Some(self.shared.locals.clone()));

        let host: Arc<dyn Host> = self.shared.clone();

        enter_context(host, || {
            loop {
                if self.shared.is_shutdown() {
                    break;
                }

                if let Some(callback) = self.next_callback() {
                    run_callback(callback);
                    continue;
                }

                self.shared.injector.park();
            }
        });

        CURRENT_LOCALS.with(|l| *l.borrow_mut() = None);
        CURRENT_WORKER_ID.with(|id| *id.borrow_mut() = None);
    }

    fn next_callback(&self) -> Option<Callback> {
        self.shared.locals[self.id]
            .pop()
            .or_else(|| self.shared.injector.steal())
            .or_else(|| self.try_steal())
    }

    /// Attempts to steal a callback from another worker's local queue.
    ///
    /// Workers are visited in a round-robin fashion to avoid
    /// starvation and distribute load evenly.
    fn try_steal(&self) -> Option<Callback> {
        let locals = &self.shared.locals;
        let len = locals.len();

        if len <= 1 {
            return None;
        }

        (1..len)
            .map(|offset| (self.id + offset) % len)
            .find_map(|victim| locals[victim].steal())
    }
}
