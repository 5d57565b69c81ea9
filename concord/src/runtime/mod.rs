//! Hosts and the future executor built on them.
//!
//! Every primitive in this crate reaches the outside world only through
//! the [`Host`] trait. This module provides:
//! - the [`EventLoop`] and [`ThreadPool`] host adapters,
//! - the process-wide host and its configuration,
//! - tasks, join handles and the thread-local host context,
//! - [`Runtime`] and [`RuntimeBuilder`], the synchronous entry point.

mod builder;
mod config;
mod core;
mod event_loop;
mod executor;
mod timer;
mod work_stealing;

pub(crate) mod context;
pub(crate) mod host;

pub mod task;

pub use self::core::Runtime;
pub use builder::RuntimeBuilder;
pub use config::{ENV_HOST_FLAVOR, ENV_WORKER_THREADS, Flavor, RuntimeConfig};
pub use event_loop::EventLoop;
pub use executor::ThreadPool;
pub use host::{Callback, Host, TimerHandle, process_host};
