use super::TaskScheduler;
use crate::sync::Waiter;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that cedes control to the scheduler once.
///
/// On first poll a lambda is scheduled at the chosen priority; the future
/// completes once the scheduler has run it. Everything queued ahead of it
/// at a lower or equal priority value, and any host event queued
/// meanwhile, gets to run first.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct YieldNow {
    scheduler: TaskScheduler,
    priority: usize,
    waiter: Option<Waiter>,
}

impl YieldNow {
    pub(crate) fn new(scheduler: TaskScheduler, priority: usize) -> Self {
        Self {
            scheduler,
            priority,
            waiter: None,
        }
    }
}

impl Future for YieldNow {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        let waiter = this.waiter.get_or_insert_with(|| {
            let waiter = Waiter::new();
            let resume = waiter.clone();

            // Already on a drain turn, so the wake need not be scheduled again.
            this.scheduler.schedule(
                move || {
                    resume.try_set_complete_inline();
                },
                this.priority,
            );

            waiter
        });

        waiter.poll_outcome(cx).map(|_| ())
    }
}

impl Drop for YieldNow {
    fn drop(&mut self) {
        if let Some(waiter) = &self.waiter {
            waiter.abandon();
        }
    }
}

impl fmt::Debug for YieldNow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YieldNow")
            .field("priority", &self.priority)
            .field("scheduled", &self.waiter.is_some())
            .finish()
    }
}

/// Yields to the global [`TaskScheduler`] at priority `0`.
///
/// # Examples
///
/// ```rust,ignore
/// for chunk in work.chunks(64) {
///     process(chunk);
///     concord::yield_now().await;
/// }
/// ```
pub fn yield_now() -> YieldNow {
    TaskScheduler::global().yield_now(0)
}
