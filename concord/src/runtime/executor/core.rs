use crate::runtime::context::{Locals, enter_context, worker_of};
use crate::runtime::executor::worker::Worker;
use crate::runtime::host::{Callback, Host, TimerHandle};
use crate::runtime::timer::TimerQueue;
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Multi-threaded host.
///
/// The `ThreadPool` is responsible for:
/// - spawning worker threads and a timer thread,
/// - distributing deferred callbacks via work-stealing,
/// - installing the host context on every thread it owns,
/// - managing orderly shutdown and thread joining.
///
/// Callbacks deferred from a worker stay on that worker's local queue;
/// callbacks deferred from anywhere else go through the global injector.
/// Ordering between callbacks is therefore only FIFO per queue, and two
/// callbacks may run at the same time on different workers.
///
/// Dropping the pool stops every thread and discards pending callbacks.
pub struct ThreadPool {
    shared: Arc<PoolShared>,

    /// Join handles for worker threads and the timer thread.
    handles: Vec<JoinHandle<()>>,
}

/// State shared between the pool handle and its threads.
pub(crate) struct PoolShared {
    /// Global injector queue shared by all workers.
    pub(crate) injector: Injector,

    /// One local queue per worker.
    pub(crate) locals: Locals,

    /// Pending timers, served by the timer thread.
    timers: Mutex<TimerQueue>,

    /// Wakes the timer thread when a new timer is registered.
    timer_signal: Condvar,

    shutdown: AtomicBool,
}

impl ThreadPool {
    /// Starts a pool with the given number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0` or if the OS refuses to spawn a thread.
    pub fn start(threads: usize) -> Self {
        assert!(threads > 0, "worker_threads must be > 0");

        let locals: Locals = Arc::new((0..threads).map(|_| Arc::new(LocalQueue::new())).collect());

        let shared = Arc::new(PoolShared {
            injector: Injector::new(),
            locals,
            timers: Mutex::new(TimerQueue::new()),
            timer_signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(threads + 1);

        for id in 0..threads {
            let worker = Worker::new(id, shared.clone());

            let handle = thread::Builder::new()
                .name(format!("concord-worker-{id}"))
                .spawn(move || worker.run())
                .expect("failed to spawn worker thread");

            handles.push(handle);
        }

        let timer_shared = shared.clone();
        let timer = thread::Builder::new()
            .name("concord-timer".to_string())
            .spawn(move || {
                let host: Arc<dyn Host> = timer_shared.clone();
                enter_context(host, || timer_shared.run_timers());
            })
            .expect("failed to spawn timer thread");

        handles.push(timer);

        tracing::debug!(threads, "thread pool started");

        Self { shared, handles }
    }

    /// Returns a shareable handle to this pool.
    ///
    /// The handle stays valid after the pool is dropped, but callbacks
    /// deferred through it are then discarded.
    pub fn handle(&self) -> Arc<dyn Host> {
        self.shared.clone()
    }

    /// Number of worker threads.
    pub fn worker_threads(&self) -> usize {
        self.shared.locals.len()
    }
}

impl Host for ThreadPool {
    fn defer(&self, callback: Callback) {
        self.shared.defer(callback);
    }

    fn defer_after(&self, delay: Duration, callback: Callback) -> TimerHandle {
        self.shared.defer_after(delay, callback)
    }
}

impl Drop for ThreadPool {
    /// Shuts down the pool.
    ///
    /// This performs the following steps:
    /// 1. Stops callback submission and wakes every parked thread
    /// 2. Joins all threads, unless called from one of them
    /// 3. Drops whatever was still queued
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.injector.shutdown();

        {
            let _timers = self.shared.timers.lock();
            self.shared.timer_signal.notify_all();
        }

        if worker_of(&self.shared.locals).is_none() {
            for handle in self.handles.drain(..) {
                let _ = handle.join();
            }
        }

        // Queued callbacks may own tasks that hold this pool's handle.
        let pending = self.shared.injector.drain();
        let local: Vec<Callback> = self.shared.locals.iter().flat_map(|queue| queue.drain()).collect();
        let timers = self.shared.timers.lock().take_all();

        tracing::debug!(
            discarded = pending.len() + local.len() + timers.len(),
            "thread pool stopped"
        );
    }
}

impl PoolShared {
    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Serves the timer queue until shutdown, moving due callbacks into the
    /// injector.
    fn run_timers(&self) {
        let mut timers = self.timers.lock();

        loop {
            if self.is_shutdown() {
                break;
            }

            let due = timers.pop_due(Instant::now());
            if !due.is_empty() {
                MutexGuard::unlocked(&mut timers, || {
                    for callback in due {
                        self.injector.push(callback);
                    }
                });
                continue;
            }

            match timers.next_deadline() {
                Some(deadline) => {
                    let _ = self.timer_signal.wait_until(&mut timers, deadline);
                }
                None => self.timer_signal.wait(&mut timers),
            }
        }
    }
}

impl Host for PoolShared {
    fn defer(&self, callback: Callback) {
        if self.is_shutdown() {
            return;
        }

        match worker_of(&self.locals) {
            Some(id) => {
                self.locals[id].push(callback);
                self.injector.notify();
            }
            None => self.injector.push(callback),
        }
    }

    fn defer_after(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let handle = TimerHandle::new();

        if delay.is_zero() {
            self.defer(handle.guard(callback));
            return handle;
        }

        if self.is_shutdown() {
            return handle;
        }

        let deadline = Instant::now() + delay;
        let swept = self.timers.lock().push(deadline, callback, handle.flag());
        self.timer_signal.notify_one();
        drop(swept);

        handle
    }
}
