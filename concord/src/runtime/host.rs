use super::config::RuntimeConfig;
use super::event_loop::EventLoop;
use super::executor::ThreadPool;
use crate::unhandled;

use once_cell::sync::OnceCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A unit of work handed to a host loop.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// The loop that ultimately runs everything.
///
/// Every primitive in this crate is written against this interface only.
/// A host offers two services: run a callback on a later turn, and run a
/// callback after a delay. Two adapters ship with the crate:
///
/// - [`EventLoop`]: one thread, one callback per turn, timers folded into
///   the same queue.
/// - [`ThreadPool`]: several worker threads plus a timer thread.
pub trait Host: Send + Sync {
    /// Runs `callback` on a later turn of the loop.
    ///
    /// Deferred callbacks never run inline, even when `defer` is called from
    /// the loop itself.
    fn defer(&self, callback: Callback);

    /// Runs `callback` once `delay` has elapsed.
    ///
    /// A zero delay skips the timer queue and behaves like [`defer`](Self::defer).
    /// The returned handle cancels the callback if it has not fired yet.
    fn defer_after(&self, delay: Duration, callback: Callback) -> TimerHandle;
}

/// Cancels a callback registered with [`Host::defer_after`].
#[derive(Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Prevents the callback from running if it has not fired yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Wraps `callback` so it becomes a no-op once this handle is cancelled.
    pub(crate) fn guard(&self, callback: Callback) -> Callback {
        let cancelled = self.flag();

        Box::new(move || {
            if !cancelled.load(Ordering::Acquire) {
                callback();
            }
        })
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Runs a host callback, routing a panic to the unhandled-error channel.
pub(crate) fn run_callback(callback: Callback) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        unhandled::report_panic(payload);
    }
}

/// Owner of the host started for the whole process.
enum HostOwner {
    EventLoop(EventLoop),
    ThreadPool(ThreadPool),
}

struct ProcessHost {
    config: RuntimeConfig,
    _owner: HostOwner,
    handle: Arc<dyn Host>,
}

static PROCESS_HOST: OnceCell<ProcessHost> = OnceCell::new();

fn start(config: &RuntimeConfig) -> ProcessHost {
    let owner = match config.flavor {
        super::Flavor::EventLoop => HostOwner::EventLoop(EventLoop::start()),
        super::Flavor::ThreadPool => HostOwner::ThreadPool(ThreadPool::start(config.worker_threads)),
    };

    let handle = match &owner {
        HostOwner::EventLoop(event_loop) => event_loop.handle(),
        HostOwner::ThreadPool(pool) => pool.handle(),
    };

    tracing::debug!(?config, "process host started");

    ProcessHost {
        config: config.clone(),
        _owner: owner,
        handle,
    }
}

/// Returns the host shared by the whole process.
///
/// The host is started on first use from [`RuntimeConfig::from_env`] unless a
/// [`RuntimeBuilder`](super::RuntimeBuilder) installed one earlier. It lives
/// until the process exits.
pub fn process_host() -> Arc<dyn Host> {
    PROCESS_HOST
        .get_or_init(|| {
            let config = RuntimeConfig::from_env().unwrap_or_else(|err| {
                tracing::warn!(%err, "invalid runtime configuration in environment, using defaults");
                RuntimeConfig::default()
            });

            start(&config)
        })
        .handle
        .clone()
}

/// Installs the process host for `config`, or returns the one already running.
pub(crate) fn install(config: &RuntimeConfig) -> Arc<dyn Host> {
    let installed = PROCESS_HOST.get_or_init(|| start(config));

    if installed.config.conflicts_with(config) {
        tracing::warn!(
            running = ?installed.config,
            requested = ?config,
            "process host already initialized with a different configuration; reusing it"
        );
    }

    installed.handle.clone()
}
