use super::JoinHandle;
use super::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::runtime::context::current_host;
use crate::runtime::host::Host;
use crate::unhandled;

use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Wake, Waker};
use std::thread;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A spawned asynchronous task managed by a host.
///
/// A `Task` acts as the container for a `Future`. It coordinates the lifecycle
/// of that future, including its execution state, waker registration,
/// and result storage.
///
/// Every poll happens inside a callback deferred to the task's host, so a
/// woken task always resumes on a later turn of the host loop.
pub(crate) struct Task<T> {
    /// The underlying future, dropped as soon as it completes.
    ///
    /// Only accessed while the task is `RUNNING`.
    future: UnsafeCell<Option<BoxFuture<T>>>,

    /// Output of the future, or the payload it panicked with.
    ///
    /// Written once before the task enters `COMPLETED`.
    pub(crate) result: UnsafeCell<Option<thread::Result<T>>>,

    /// The current lifecycle state of the task (IDLE, RUNNING, etc.).
    pub(crate) state: AtomicUsize,

    /// Host the task is polled on.
    host: Arc<dyn Host>,

    pub(crate) completion: Mutex<Completion>,
}

/// Bookkeeping shared between a task and its `JoinHandle`.
pub(crate) struct Completion {
    /// Wakers of `JoinHandle`s awaiting this task.
    pub(crate) waiters: Vec<Waker>,

    /// Set once the `JoinHandle` is dropped; the result then has no reader.
    pub(crate) detached: bool,
}

unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T> Task<T> {
    /// Drops a result nobody will read, reporting it if it is a panic.
    ///
    /// Callers must hold the `completion` lock and have observed `COMPLETED`.
    pub(crate) fn discard_result(&self) {
        // Safety: the result is only touched after COMPLETED, under the
        // completion lock or by the sole JoinHandle.
        let result = unsafe { (*self.result.get()).take() };

        if let Some(Err(payload)) = result {
            unhandled::report_panic(payload);
        }
    }
}

impl<T: Send + 'static> Task<T> {
    /// Creates a new task instance from a future.
    ///
    /// The task is initialized in the `QUEUED` state; the caller is expected
    /// to [`schedule`](Self::schedule) it right away.
    pub(crate) fn new<F>(future: F, host: Arc<dyn Host>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: UnsafeCell::new(Some(Box::pin(future))),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            host,
            completion: Mutex::new(Completion {
                waiters: Vec::new(),
                detached: false,
            }),
        }
    }

    /// Defers a poll of this task to its host.
    pub(crate) fn schedule(self: Arc<Self>) {
        let host = self.host.clone();
        host.defer(Box::new(move || self.run()));
    }

    /// Polls the task once.
    ///
    /// This method transitions the task to `RUNNING`, polls the inner future,
    /// and handles the outcome:
    /// - `Poll::Pending`: transitions back to `IDLE` or re-queues if notified.
    /// - `Poll::Ready`: stores the result and notifies all `JoinHandle` waiters.
    /// - a panic: stores the payload so the `JoinHandle` can resume it.
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        // Transition to RUNNING. This ensures exclusive access to the UnsafeCell.
        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: The RUNNING state guarantees that no other thread is polling this future.
        let slot = unsafe { &mut *self.future.get() };
        let Some(future) = slot.as_mut() else {
            return;
        };

        let poll = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

        match poll {
            Ok(Poll::Pending) => {
                // Return to IDLE state unless a wake-up occurred during execution (NOTIFIED).
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.state.store(QUEUED, Ordering::Release);
                    self.schedule();
                }
            }
            Ok(Poll::Ready(value)) => {
                *slot = None;
                self.complete(Ok(value));
            }
            Err(payload) => {
                *slot = None;
                self.complete(Err(payload));
            }
        }
    }

    fn complete(&self, result: thread::Result<T>) {
        unsafe {
            *self.result.get() = Some(result);
        }
        self.state.store(COMPLETED, Ordering::Release);

        let waiters = {
            let mut completion = self.completion.lock();

            if completion.detached {
                self.discard_result();
            }

            std::mem::take(&mut completion.waiters)
        };

        for waker in waiters {
            waker.wake();
        }
    }
}

impl<T: Send + 'static> Wake for Task<T> {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    /// Signals the task to be rescheduled.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and is deferred to its host.
    /// If the task is `RUNNING`, it moves to `NOTIFIED` to ensure it is re-polled
    /// right after its current poll.
    fn wake_by_ref(self: &Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.clone().schedule();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already queued, notified, or finished.
                _ => return,
            }
        }
    }
}

/// Spawns a future as a task onto the current host.
///
/// Inside a host thread the task runs on that host; anywhere else it runs
/// on the [process host](crate::process_host).
///
/// Dropping the returned [`JoinHandle`] does not cancel the task. If a
/// detached task panics, the panic is reported to the
/// [unhandled-error channel](crate::unhandled).
///
/// # Examples
///
/// ```rust,ignore
/// let handle = concord::task::spawn(async { 21 * 2 });
/// assert_eq!(handle.await, 42);
/// ```
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    spawn_on(current_host(), future)
}

/// Spawns a future onto a specific host.
pub(crate) fn spawn_on<F, T>(host: Arc<dyn Host>, future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let task = Arc::new(Task::new(future, host));
    task.clone().schedule();

    JoinHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::event_loop::EventLoop;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_spawned_task_runs_on_its_host() {
        let event_loop = EventLoop::start();
        let (tx, rx) = mpsc::channel();

        let _handle = spawn_on(event_loop.handle(), async move {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        });

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("concord-event-loop"));
    }

    #[test]
    fn test_nested_spawn_uses_current_host() {
        let event_loop = EventLoop::start();
        let (tx, rx) = mpsc::channel();

        let _outer = spawn_on(event_loop.handle(), async move {
            let _inner = spawn(async move {
                tx.send(thread::current().name().map(str::to_string)).unwrap();
            });
        });

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("concord-event-loop"));
    }
}
