use crate::error::ConfigError;

use std::env;
use std::str::FromStr;
use std::thread;

/// Environment variable selecting the host flavor.
pub const ENV_HOST_FLAVOR: &str = "CONCORD_HOST_FLAVOR";

/// Environment variable setting the number of pool worker threads.
pub const ENV_WORKER_THREADS: &str = "CONCORD_WORKER_THREADS";

/// Which host adapter drives the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Flavor {
    /// One thread, one callback per turn.
    #[default]
    EventLoop,

    /// Worker threads with work stealing, plus a timer thread.
    ThreadPool,
}

impl FromStr for Flavor {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "event_loop" | "event-loop" => Ok(Flavor::EventLoop),
            "thread_pool" | "thread-pool" => Ok(Flavor::ThreadPool),
            _ => Err(ConfigError::InvalidFlavor {
                var: ENV_HOST_FLAVOR,
                value: value.to_string(),
            }),
        }
    }
}

/// Host configuration.
///
/// Values come from, in increasing precedence: [`Default`], the environment
/// (see [`from_env`](Self::from_env)), and [`RuntimeBuilder`](super::RuntimeBuilder)
/// methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub flavor: Flavor,

    /// Number of pool workers. Ignored by [`Flavor::EventLoop`].
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            flavor: Flavor::default(),
            worker_threads,
        }
    }
}

impl RuntimeConfig {
    /// Builds a configuration from the defaults and the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Overrides fields from the environment, leaving unset ones untouched.
    ///
    /// Stops at the first invalid variable; fields applied before it keep
    /// their new value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| env::var(var).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_HOST_FLAVOR) {
            self.flavor = value.parse()?;
        }

        if let Some(value) = lookup(ENV_WORKER_THREADS) {
            let threads: usize = value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: ENV_WORKER_THREADS,
                value: value.clone(),
            })?;

            if threads == 0 {
                return Err(ConfigError::ZeroWorkers {
                    var: ENV_WORKER_THREADS,
                });
            }

            self.worker_threads = threads;
        }

        Ok(())
    }

    /// Returns `true` if a host started from `self` would not honor `other`.
    pub(crate) fn conflicts_with(&self, other: &RuntimeConfig) -> bool {
        match (self.flavor, other.flavor) {
            (Flavor::EventLoop, Flavor::EventLoop) => false,
            (Flavor::ThreadPool, Flavor::ThreadPool) => self.worker_threads != other.worker_threads,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn apply(vars: &[(&str, &str)]) -> Result<RuntimeConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut config = RuntimeConfig {
            flavor: Flavor::EventLoop,
            worker_threads: 2,
        };
        config.apply_overrides(|var| vars.get(var).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_unset_variables_keep_defaults() {
        let config = apply(&[]).unwrap();

        assert_eq!(config.flavor, Flavor::EventLoop);
        assert_eq!(config.worker_threads, 2);
    }

    #[test]
    fn test_flavor_accepts_both_spellings() {
        assert_eq!(apply(&[(ENV_HOST_FLAVOR, "thread_pool")]).unwrap().flavor, Flavor::ThreadPool);
        assert_eq!(apply(&[(ENV_HOST_FLAVOR, "Thread-Pool")]).unwrap().flavor, Flavor::ThreadPool);
        assert_eq!(apply(&[(ENV_HOST_FLAVOR, "event-loop")]).unwrap().flavor, Flavor::EventLoop);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            apply(&[(ENV_HOST_FLAVOR, "fibers")]),
            Err(ConfigError::InvalidFlavor {
                var: ENV_HOST_FLAVOR,
                value: "fibers".to_string(),
            })
        );
        assert_eq!(
            apply(&[(ENV_WORKER_THREADS, "many")]),
            Err(ConfigError::InvalidNumber {
                var: ENV_WORKER_THREADS,
                value: "many".to_string(),
            })
        );
        assert_eq!(
            apply(&[(ENV_WORKER_THREADS, "0")]),
            Err(ConfigError::ZeroWorkers { var: ENV_WORKER_THREADS })
        );
    }

    #[test]
    fn test_worker_count_only_conflicts_for_thread_pools() {
        let event_loop = RuntimeConfig {
            flavor: Flavor::EventLoop,
            worker_threads: 1,
        };
        let pool = |n| RuntimeConfig {
            flavor: Flavor::ThreadPool,
            worker_threads: n,
        };

        assert!(!event_loop.conflicts_with(&RuntimeConfig {
            worker_threads: 8,
            ..event_loop.clone()
        }));
        assert!(event_loop.conflicts_with(&pool(1)));
        assert!(pool(2).conflicts_with(&pool(4)));
        assert!(!pool(4).conflicts_with(&pool(4)));
    }
}
