use crate::runtime::context::enter_context;
use crate::runtime::host::{Callback, Host, TimerHandle, run_callback};
use crate::runtime::timer::TimerQueue;

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Single-threaded host.
///
/// One dedicated thread runs exactly one callback per turn, in FIFO order.
/// Timers that come due are appended behind the callbacks already queued,
/// so a timer never jumps ahead of work deferred before it fired. While
/// nothing is runnable the thread sleeps until the next timer deadline.
///
/// Dropping the loop stops the thread and discards pending callbacks.
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoop::start();
/// event_loop.defer(Box::new(|| println!("next turn")));
/// ```
pub struct EventLoop {
    shared: Arc<LoopShared>,
    thread: Option<JoinHandle<()>>,
}

struct LoopShared {
    state: Mutex<LoopState>,

    /// Wakes the loop thread when work is queued or a timer is registered.
    signal: Condvar,

    shutdown: AtomicBool,

    /// Set once the loop thread is running.
    thread_id: Mutex<Option<ThreadId>>,
}

struct LoopState {
    /// Macrotask queue, one callback per turn.
    ready: VecDeque<Callback>,
    timers: TimerQueue,
}

impl EventLoop {
    /// Starts the loop on a new thread named `concord-event-loop`.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    pub fn start() -> Self {
        let shared = Arc::new(LoopShared {
            state: Mutex::new(LoopState {
                ready: VecDeque::new(),
                timers: TimerQueue::new(),
            }),
            signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
            thread_id: Mutex::new(None),
        });

        let loop_shared = shared.clone();
        let thread = thread::Builder::new()
            .name("concord-event-loop".to_string())
            .spawn(move || {
                *loop_shared.thread_id.lock() = Some(thread::current().id());

                let host: Arc<dyn Host> = loop_shared.clone();
                enter_context(host, || loop_shared.run());
            })
            .expect("failed to spawn event loop thread");

        tracing::debug!("event loop started");

        Self {
            shared,
            thread: Some(thread),
        }
    }

    /// Returns a shareable handle to this loop.
    ///
    /// The handle stays valid after the loop is dropped, but callbacks
    /// deferred through it are then discarded.
    pub fn handle(&self) -> Arc<dyn Host> {
        self.shared.clone()
    }

    /// Returns `true` when called from the loop thread.
    pub fn is_current(&self) -> bool {
        *self.shared.thread_id.lock() == Some(thread::current().id())
    }
}

impl Host for EventLoop {
    fn defer(&self, callback: Callback) {
        self.shared.defer(callback);
    }

    fn defer_after(&self, delay: Duration, callback: Callback) -> TimerHandle {
        self.shared.defer_after(delay, callback)
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);

        {
            let _state = self.shared.state.lock();
            self.shared.signal.notify_all();
        }

        if let Some(thread) = self.thread.take() {
            if !self.is_current() {
                let _ = thread.join();
            }
        }

        tracing::debug!("event loop stopped");
    }
}

impl LoopShared {
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn run(&self) {
        let mut state = self.state.lock();

        loop {
            if self.is_shutdown() {
                break;
            }

            let due = state.timers.pop_due(Instant::now());
            state.ready.extend(due);

            if let Some(callback) = state.ready.pop_front() {
                MutexGuard::unlocked(&mut state, || run_callback(callback));
                continue;
            }

            match state.timers.next_deadline() {
                Some(deadline) => {
                    let _ = self.signal.wait_until(&mut state, deadline);
                }
                None => self.signal.wait(&mut state),
            }
        }

        // Pending callbacks may own tasks holding this loop's handle; drop
        // them outside the lock since their destructors may defer.
        let ready = std::mem::take(&mut state.ready);
        let timers = state.timers.take_all();
        drop(state);

        tracing::trace!(discarded = ready.len() + timers.len(), "event loop drained");

        drop(ready);
        drop(timers);
    }
}

impl Host for LoopShared {
    fn defer(&self, callback: Callback) {
        if self.is_shutdown() {
            return;
        }

        self.state.lock().ready.push_back(callback);
        self.signal.notify_one();
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
        let swept = self.state.lock().timers.push(deadline, callback, handle.flag());
        self.signal.notify_one();
        drop(swept);

        handle
    }
}
