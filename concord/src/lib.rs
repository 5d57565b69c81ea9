//! # Concord
//!
//! **Concord** is a small set of awaitable coordination primitives and a
//! cooperative priority scheduler, written once against a minimal host
//! interface so that they behave the same on a single-threaded event loop
//! and on a multi-threaded pool.
//!
//! It offers:
//!
//! - **Wait handles** with auto- and manual-reset modes, and a `when_any`
//!   race with an optional timeout
//! - **An async mutex** built from an auto-reset event
//! - **Timer events** that set themselves after a delay, optionally repeating
//! - **A task scheduler** that drains a priority queue of lambdas one per
//!   host turn, with a priority-aware `yield_now`
//! - **Task helpers** such as `delay` and fire-and-forget `run` / `run_async`
//! - **Ergonomic macros** like `#[concord::main]`, `#[concord::test]` and `join!`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use concord::sync::ManualResetEvent;
//! use concord::task;
//! use std::time::Duration;
//!
//! #[concord::main]
//! async fn main() {
//!     let ready = ManualResetEvent::new(false);
//!
//!     let signal = ready.clone();
//!     task::spawn(async move {
//!         task::delay(Duration::from_millis(100)).await;
//!         signal.set();
//!     });
//!
//!     ready.wait().await.unwrap();
//!     println!("ready");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`sync`]: wait handles, events, timer events and mutexes
//! - [`task`]: spawning and fire-and-forget helpers
//! - [`time`]: timer-based suspension
//! - [`collections`]: the FIFO and priority queues used internally
//! - [`unhandled`]: the process-wide channel for errors nobody awaits
//!
//! ## Hosts
//!
//! Everything runs on a [`Host`]. The process host is an [`EventLoop`] by
//! default; set `CONCORD_HOST_FLAVOR=thread_pool` (and optionally
//! `CONCORD_WORKER_THREADS`) or use [`RuntimeBuilder`] to run on a
//! [`ThreadPool`] instead.

mod error;
mod runtime;
mod scheduler;

pub mod collections;
pub mod sync;
pub mod time;
pub mod unhandled;

pub use error::{ConfigError, WaitError};
pub use runtime::task;
pub use runtime::{
    Callback, ENV_HOST_FLAVOR, ENV_WORKER_THREADS, EventLoop, Flavor, Host, Runtime,
    RuntimeBuilder, RuntimeConfig, ThreadPool, TimerHandle, process_host,
};
pub use scheduler::{TaskScheduler, YieldNow, yield_now};

pub use concord_macros::*;
