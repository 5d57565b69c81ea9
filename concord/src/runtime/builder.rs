use super::config::{Flavor, RuntimeConfig};
use super::Runtime;

/// Builder for configuring and creating a runtime.
///
/// The builder starts from [`RuntimeConfig::from_env`]. An invalid
/// environment value is logged and ignored.
///
/// Only the first runtime built in a process decides how the
/// [process host](crate::process_host) is configured. Later builds reuse
/// that host and log a warning if they asked for something else.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .flavor(Flavor::ThreadPool)
///     .worker_threads(4)
///     .build();
/// ```
pub struct RuntimeBuilder {
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` from the defaults and the environment.
    ///
    /// By default, the host is an [`EventLoop`](crate::EventLoop) and the
    /// worker count is the number of available logical CPUs, falling back
    /// to `1` if unavailable.
    pub fn new() -> Self {
        let mut config = RuntimeConfig::default();

        if let Err(err) = config.apply_env_overrides() {
            tracing::warn!(%err, "ignoring invalid runtime configuration from environment");
        }

        Self { config }
    }

    /// Selects the host adapter.
    pub fn flavor(mut self, flavor: Flavor) -> Self {
        self.config.flavor = flavor;
        self
    }

    /// Sets the number of worker threads used by a thread-pool host.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.config.worker_threads = n;
        self
    }

    /// Returns the configuration the runtime will request.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Builds the runtime, starting the process host if needed.
    pub fn build(self) -> Runtime {
        Runtime::new(self.config)
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
