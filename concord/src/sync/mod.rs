//! Awaitable coordination primitives.
//!
//! Every primitive here is built on [`WaitHandle`]:
//! - [`WaitHandle`]: a set/unset event with auto- or manual-reset mode,
//!   and the [`when_any`](WaitHandle::when_any) race,
//! - [`AutoResetEvent`] and [`ManualResetEvent`]: typed constructors,
//! - [`TimerEvent`]: a handle that sets itself after a delay, optionally
//!   repeating,
//! - [`AsyncMutex`] and [`Mutex`]: mutual exclusion built from an
//!   auto-reset event and an atomic flag,
//! - [`Waiter`]: the one-shot completion slot behind every pending wait.
//!
//! ## Design notes
//!
//! - Waits are registered when `wait()` is called, so waiters are served in
//!   call order.
//! - `set()` never resumes a waiter inline. Completions go through the
//!   global [`TaskScheduler`](crate::TaskScheduler) and resume on a later
//!   turn.
//! - Handles are cheap to clone and safe to share between threads.

mod events;
mod mutex;
mod timer_event;
mod wait_handle;
mod waiter;

pub use events::{AutoResetEvent, ManualResetEvent};
pub use mutex::{AsyncMutex, Lock, Mutex, MutexGuard};
pub use timer_event::TimerEvent;
pub use wait_handle::{WaitHandle, WhenAny};
pub use waiter::{Wait, Waiter};
