use crate::error::WaitError;
use crate::scheduler::TaskScheduler;

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

/// A one-shot completion slot for a single suspended wait.
///
/// A `Waiter` completes at most once: the first call to
/// [`try_set_complete`](Self::try_set_complete) or
/// [`try_set_canceled`](Self::try_set_canceled) wins and every later call
/// returns `false`.
///
/// Completing a waiter never resumes its consumer inline. The consumer's
/// waker is handed to the global [`TaskScheduler`] at priority `0`, so the
/// wait resumes on a later turn.
///
/// Clones share the same slot.
#[derive(Clone)]
pub struct Waiter {
    inner: Arc<WaiterInner>,
}

struct WaiterInner {
    is_complete: AtomicBool,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    outcome: Option<Result<(), WaitError>>,
    waker: Option<Waker>,
}

/// How the consumer of a completed waiter is resumed.
#[derive(Clone, Copy)]
enum Resume {
    /// Through the global scheduler at priority `0`.
    Scheduled,

    /// Immediately, for completions that already run from the scheduler.
    Inline,
}

impl Waiter {
    /// Creates a pending waiter.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(WaiterInner {
                is_complete: AtomicBool::new(false),
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Returns `true` once the waiter has been completed, cancelled or
    /// abandoned.
    pub fn is_complete(&self) -> bool {
        self.inner.is_complete.load(Ordering::Acquire)
    }

    /// Completes the waiter successfully.
    ///
    /// Returns `false` if the waiter was already complete.
    pub fn try_set_complete(&self) -> bool {
        self.finish(Ok(()), Resume::Scheduled)
    }

    /// Completes the waiter with [`WaitError::Canceled`].
    ///
    /// Returns `false` if the waiter was already complete.
    pub fn try_set_canceled(&self) -> bool {
        self.finish(Err(WaitError::Canceled), Resume::Scheduled)
    }

    /// Completes the waiter and wakes its consumer right away.
    ///
    /// Only for callers that already run as a scheduled lambda.
    pub(crate) fn try_set_complete_inline(&self) -> bool {
        self.finish(Ok(()), Resume::Inline)
    }

    /// Marks the waiter complete without delivering anything.
    ///
    /// Used when the consumer goes away, so that a producer scanning its
    /// waiter queue skips this one instead of spending a signal on it.
    pub(crate) fn abandon(&self) -> bool {
        if self
            .inner
            .is_complete
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.inner.slot.lock().waker = None;
        true
    }

    fn finish(&self, outcome: Result<(), WaitError>, resume: Resume) -> bool {
        if self
            .inner
            .is_complete
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let waker = {
            let mut slot = self.inner.slot.lock();
            slot.outcome = Some(outcome);
            slot.waker.take()
        };

        if let Some(waker) = waker {
            match resume {
                Resume::Scheduled => TaskScheduler::global().schedule(move || waker.wake(), 0),
                Resume::Inline => waker.wake(),
            }
        }

        true
    }

    /// Polls for the outcome, registering `cx`'s waker while pending.
    pub(crate) fn poll_outcome(&self, cx: &mut Context<'_>) -> Poll<Result<(), WaitError>> {
        let mut slot = self.inner.slot.lock();

        if let Some(outcome) = slot.outcome {
            return Poll::Ready(outcome);
        }

        match &slot.waker {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            _ => slot.waker = Some(cx.waker().clone()),
        }

        Poll::Pending
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("is_complete", &self.is_complete())
            .finish()
    }
}

/// Future returned by [`WaitHandle::wait`](super::WaitHandle::wait).
///
/// The wait is registered when `wait()` is called, not on first poll, so
/// waits created in sequence are served in that order.
///
/// Dropping a pending `Wait` abandons its waiter: a later `set()` on an
/// auto-reset handle then goes to the next waiter instead of being lost.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Wait {
    waiter: Option<Waiter>,
}

impl Wait {
    /// A wait that is already satisfied.
    pub(crate) fn ready() -> Self {
        Self { waiter: None }
    }

    pub(crate) fn pending(waiter: Waiter) -> Self {
        Self {
            waiter: Some(waiter),
        }
    }

    /// Returns `true` if awaiting this future would complete right away.
    pub fn is_complete(&self) -> bool {
        self.waiter.as_ref().is_none_or(Waiter::is_complete)
    }

    /// Withdraws a wait that is still pending.
    ///
    /// Returns `false` if the wait had already been satisfied, in which case
    /// the caller owns the signal that satisfied it.
    pub(crate) fn abandon(&self) -> bool {
        self.waiter.as_ref().is_some_and(Waiter::abandon)
    }
}

impl Future for Wait {
    type Output = Result<(), WaitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &self.waiter {
            Some(waiter) => waiter.poll_outcome(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl Drop for Wait {
    fn drop(&mut self) {
        if let Some(waiter) = &self.waiter {
            waiter.abandon();
        }
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("is_complete", &self.is_complete())
            .finish()
    }
}
