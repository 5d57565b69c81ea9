//! Task lifecycle states.
//!
//! ```text
//! IDLE -> QUEUED -> RUNNING -> IDLE | NOTIFIED -> QUEUED -> ... -> COMPLETED
//! ```

/// Task is idle and not scheduled.
///
/// The future returned `Poll::Pending` and is waiting for a wake-up.
pub(crate) const IDLE: usize = 0;

/// Task is queued on its host.
///
/// A run callback has been deferred and not yet executed.
pub(crate) const QUEUED: usize = 1;

/// Task is currently being polled.
///
/// At most one thread may observe this state at a time.
pub(crate) const RUNNING: usize = 2;

/// Task has completed execution.
///
/// The future returned `Poll::Ready` or panicked, and will not be polled
/// again.
pub(crate) const COMPLETED: usize = 3;

/// Task has been woken while running.
///
/// The task is re-queued as soon as the current poll returns.
pub(crate) const NOTIFIED: usize = 4;
