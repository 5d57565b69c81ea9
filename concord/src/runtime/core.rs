use super::config::RuntimeConfig;
use super::context::on_host_thread;
use super::host::{self, Host};
use super::task::{JoinHandle, spawn_on};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};

/// Entry point into the process host.
///
/// `Runtime` is responsible for:
/// - spawning asynchronous tasks on the host,
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// The host itself is shared by the whole process and outlives every
/// `Runtime`; dropping a runtime does not stop it.
pub struct Runtime {
    host: Arc<dyn Host>,
    config: RuntimeConfig,
}

/// Unparks the thread blocked in [`Runtime::block_on`].
struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

impl Runtime {
    /// Creates a runtime on the process host, installing it from `config`
    /// if no host is running yet.
    pub(crate) fn new(config: RuntimeConfig) -> Self {
        let host = host::install(&config);

        Self { host, config }
    }

    /// Spawns a future onto the host.
    ///
    /// The future is executed asynchronously and runs until completion.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = runtime.spawn(async { 42 });
    /// ```
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        spawn_on(self.host.clone(), future)
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// This method is typically used as the synchronous entry point
    /// of the runtime (e.g. in `main` or tests).
    ///
    /// The future is spawned onto the host and the current thread parks
    /// until the task completes.
    ///
    /// # Panics
    ///
    /// Resumes the panic of the future, if it panicked. Also panics when
    /// called from a host thread, which would otherwise deadlock the host.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async {
    ///     42
    /// });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        assert!(
            !on_host_thread(),
            "block_on cannot be called from a host thread"
        );

        let mut handle = self.spawn(future);

        let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
        let mut cx = Context::from_waker(&waker);

        loop {
            match Pin::new(&mut handle).poll(&mut cx) {
                Poll::Ready(output) => return output,
                Poll::Pending => thread::park(),
            }
        }
    }

    /// Returns the host this runtime spawns onto.
    pub fn host(&self) -> Arc<dyn Host> {
        self.host.clone()
    }

    /// Returns the configuration this runtime was built with.
    ///
    /// The running host may differ if another configuration installed it
    /// first.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
