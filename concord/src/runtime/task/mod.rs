//! Asynchronous tasks and fire-and-forget helpers.
//!
//! It includes:
//! - [`spawn`] and [`JoinHandle`] for running futures on a host,
//! - [`run`] and [`run_async`] for fire-and-forget work on the
//!   [`TaskScheduler`],
//! - [`delay`] for timer-based suspension.

pub(crate) mod handle;
pub(crate) mod state;

mod core;

pub(crate) use core::{Task, spawn_on};

pub use crate::time::delay;
pub use core::spawn;
pub use handle::JoinHandle;

use crate::scheduler::TaskScheduler;

/// Schedules `lambda` on the global [`TaskScheduler`] at priority `0`.
///
/// A panic inside `lambda` is reported to the
/// [unhandled-error channel](crate::unhandled).
pub fn run<F>(lambda: F)
where
    F: FnOnce() + Send + 'static,
{
    TaskScheduler::global().schedule(lambda, 0);
}

/// Starts `future` from the global [`TaskScheduler`] at priority `0`.
///
/// An `Err` output is reported as a scheduled task failure.
///
/// # Examples
///
/// ```rust,ignore
/// concord::task::run_async(async {
///     refresh_config().await?;
///     Ok(())
/// });
/// ```
pub fn run_async<F>(future: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    TaskScheduler::global().schedule_async(future, 0);
}
