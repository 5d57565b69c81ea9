use crate::runtime::host::{Host, process_host};
use crate::runtime::work_stealing::queue::LocalQueue;

use std::cell::RefCell;
use std::sync::Arc;

/// Local queues of one thread pool, shared by all of its workers.
pub(crate) type Locals = Arc<Vec<Arc<LocalQueue>>>;

thread_local! {
    /// Thread-local handle to the host driving the current thread.
    ///
    /// This is set by host threads (the event loop thread, pool workers and
    /// the pool timer thread) and lets primitives reach their host without
    /// explicit parameter passing.
    pub(crate) static CURRENT_HOST: RefCell<Option<Arc<dyn Host>>> =
        const { RefCell::new(None) };

    /// Thread-local identifier of the current pool worker.
    pub(crate) static CURRENT_WORKER_ID: RefCell<Option<usize>> =
        const { RefCell::new(None) };

    /// Thread-local references to the local queues of the current pool.
    ///
    /// A pool compares this against its own queues to decide whether a
    /// deferred callback may stay on the calling worker.
    pub(crate) static CURRENT_LOCALS: RefCell<Option<Locals>> =
        const { RefCell::new(None) };
}

/// Enters a host context for the current thread.
///
/// This function temporarily installs `host` as the thread-local host for
/// the duration of the closure `f`. After the closure completes, the
/// previous context is restored.
///
/// # Arguments
///
/// * `host` - Host driving the current thread.
/// * `f` - Closure executed inside the host context.
pub(crate) fn enter_context<R>(host: Arc<dyn Host>, f: impl FnOnce() -> R) -> R {
    CURRENT_HOST.with(|h| {
        let prev = h.replace(Some(host));
        let out = f();
        h.replace(prev);
        out
    })
}

/// Returns the host of the current thread, or the process host when called
/// from a thread no host owns.
pub(crate) fn current_host() -> Arc<dyn Host> {
    CURRENT_HOST
        .with(|h| h.borrow().clone())
        .unwrap_or_else(process_host)
}

/// Returns `true` when the current thread is driven by a host.
pub(crate) fn on_host_thread() -> bool {
    CURRENT_HOST.with(|h| h.borrow().is_some())
}

/// Returns the worker id if the current thread is a worker of the pool that
/// owns `locals`.
pub(crate) fn worker_of(locals: &Locals) -> Option<usize> {
    let same_pool = CURRENT_LOCALS.with(|l| {
        l.borrow()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, locals))
    });

    if same_pool {
        CURRENT_WORKER_ID.with(|id| *id.borrow())
    } else {
        None
    }
}
