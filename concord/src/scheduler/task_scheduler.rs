use super::YieldNow;
use crate::collections::PriorityQueue;
use crate::runtime::host::{Host, process_host};
use crate::runtime::task::spawn_on;
use crate::unhandled::{self, ErrorKind};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Lambda = Box<dyn FnOnce() + Send + 'static>;

/// Number of schedulers constructed in this process.
static INSTANCES: AtomicUsize = AtomicUsize::new(0);

static GLOBAL: OnceCell<TaskScheduler> = OnceCell::new();

/// A priority queue of lambdas drained by a host.
///
/// [`schedule`](Self::schedule) enqueues a lambda and, when the queue was
/// idle, asks the host for one drain turn. Each drain turn runs exactly one
/// lambda (lowest priority value first, FIFO within a priority) and asks for
/// another turn while work remains. At most one drain turn is outstanding
/// at a time.
///
/// A panicking lambda is reported to the
/// [unhandled-error channel](crate::unhandled) and draining continues.
///
/// Priorities are only ordered within one scheduler, so a process should
/// use [`global`](Self::global). Constructing a second scheduler logs a
/// warning.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    host: Arc<dyn Host>,
    state: Mutex<State>,
}

struct State {
    ready: PriorityQueue<Lambda>,

    /// Drain turns requested from the host and not started yet.
    drains_in_flight: usize,
}

impl TaskScheduler {
    /// Creates a scheduler draining on `host`.
    pub fn new(host: Arc<dyn Host>) -> Self {
        let instance = INSTANCES.fetch_add(1, Ordering::AcqRel) + 1;

        if instance > 1 {
            tracing::warn!(
                instances = instance,
                "multiple TaskScheduler instances; priorities are not ordered across them"
            );
        } else {
            tracing::debug!("task scheduler created");
        }

        Self {
            inner: Arc::new(Inner {
                host,
                state: Mutex::new(State {
                    ready: PriorityQueue::new(),
                    drains_in_flight: 0,
                }),
            }),
        }
    }

    /// Returns the process-wide scheduler, draining on the
    /// [process host](crate::process_host).
    pub fn global() -> &'static TaskScheduler {
        GLOBAL.get_or_init(|| TaskScheduler::new(process_host()))
    }

    /// Enqueues `lambda` at `priority`; `0` runs first.
    ///
    /// The lambda always runs on a later host turn, never inline.
    pub fn schedule<F>(&self, lambda: F, priority: usize)
    where
        F: FnOnce() + Send + 'static,
    {
        let request_drain = {
            let mut state = self.inner.state.lock();
            state.ready.enqueue(Box::new(lambda), priority);

            if state.ready.len() == 1 && state.drains_in_flight == 0 {
                state.drains_in_flight += 1;
                true
            } else {
                false
            }
        };

        if request_drain {
            self.request_drain();
        }
    }

    /// Schedules the start of `future` at `priority`.
    ///
    /// The future is spawned on the scheduler's host from a scheduled lambda
    /// and nobody awaits it. An `Err` output is reported as a
    /// [`ScheduledFailure`](ErrorKind::ScheduledFailure), a panic as a
    /// [`Panic`](ErrorKind::Panic).
    pub fn schedule_async<F>(&self, future: F, priority: usize)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let host = self.inner.host.clone();

        self.schedule(
            move || {
                // Dropping the handle detaches the task; a panic is then
                // reported when it completes.
                let _detached = spawn_on(host, async move {
                    if let Err(err) = future.await {
                        report_failure(&err);
                    }
                });
            },
            priority,
        );
    }

    /// Returns a future that completes once the scheduler reaches it at
    /// `priority`.
    ///
    /// Lambdas already queued at a lower or equal priority value run first,
    /// and at least one host turn passes.
    pub fn yield_now(&self, priority: usize) -> YieldNow {
        YieldNow::new(self.clone(), priority)
    }

    /// Number of lambdas waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().ready.len()
    }

    fn request_drain(&self) {
        let scheduler = self.clone();
        self.inner.host.defer(Box::new(move || scheduler.execute_tasks()));
    }

    /// One drain turn: runs the next lambda and requests another turn if
    /// work remains and none is outstanding.
    fn execute_tasks(&self) {
        let lambda = {
            let mut state = self.inner.state.lock();
            state.drains_in_flight = state.drains_in_flight.saturating_sub(1);
            state.ready.dequeue()
        };

        if let Some(lambda) = lambda {
            tracing::trace!("running scheduled lambda");

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(lambda)) {
                unhandled::report_panic(payload);
            }
        }

        let request_drain = {
            let mut state = self.inner.state.lock();

            if !state.ready.is_empty() && state.drains_in_flight == 0 {
                state.drains_in_flight += 1;
                true
            } else {
                false
            }
        };

        if request_drain {
            self.request_drain();
        }
    }
}

fn report_failure(err: &anyhow::Error) {
    let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
    let detail = (!causes.is_empty()).then(|| format!("caused by: {}", causes.join(": ")));

    unhandled::report(ErrorKind::ScheduledFailure, err.to_string(), detail);
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();

        f.debug_struct("TaskScheduler")
            .field("pending", &state.ready.len())
            .field("drains_in_flight", &state.drains_in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::EventLoop;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_lambdas_run_by_priority_then_fifo() {
        let event_loop = EventLoop::start();
        let scheduler = TaskScheduler::new(event_loop.handle());
        let (tx, rx) = mpsc::channel();

        // Hold the loop so everything below is queued before the first drain.
        let (release_tx, release_rx) = mpsc::channel::<()>();
        event_loop.defer(Box::new(move || {
            let _ = release_rx.recv();
        }));

        for (tag, priority) in [("c", 2), ("a1", 0), ("b", 1), ("a2", 0)] {
            let tx = tx.clone();
            scheduler.schedule(move || tx.send(tag).unwrap(), priority);
        }
        assert_eq!(scheduler.pending(), 4);
        release_tx.send(()).unwrap();

        let order: Vec<_> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();

        assert_eq!(order, vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn test_one_lambda_per_host_turn() {
        let event_loop = EventLoop::start();
        let host = event_loop.handle();
        let scheduler = TaskScheduler::new(host.clone());
        let (tx, rx) = mpsc::channel();

        let (release_tx, release_rx) = mpsc::channel::<()>();
        event_loop.defer(Box::new(move || {
            let _ = release_rx.recv();
        }));

        let first_tx = tx.clone();
        let event_tx = tx.clone();
        scheduler.schedule(
            move || {
                first_tx.send("lambda 1").unwrap();
                host.defer(Box::new(move || event_tx.send("host event").unwrap()));
            },
            0,
        );
        scheduler.schedule(move || tx.send("lambda 2").unwrap(), 0);
        release_tx.send(()).unwrap();

        let order: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();

        assert_eq!(order, vec!["lambda 1", "host event", "lambda 2"]);
    }

    #[test]
    fn test_panicking_lambda_does_not_stop_draining() {
        let event_loop = EventLoop::start();
        let scheduler = TaskScheduler::new(event_loop.handle());
        let (tx, rx) = mpsc::channel();

        scheduler.schedule(|| panic!("scheduled lambda failure"), 0);
        scheduler.schedule(move || tx.send(()).unwrap(), 0);

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(
            unhandled::retained_errors()
                .iter()
                .any(|e| e.kind == ErrorKind::Panic && e.message == "scheduled lambda failure")
        );
    }
}
