use super::timer_event::TimerEvent;
use super::waiter::{Wait, Waiter};
use crate::collections::Queue;
use crate::error::WaitError;

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// An awaitable event.
///
/// A `WaitHandle` is either set or unset. Waiting on a set handle completes
/// right away; waiting on an unset one enqueues a [`Waiter`] that a later
/// [`set`](Self::set) completes. Waiters are served FIFO.
///
/// The reset mode is fixed at construction:
///
/// - **auto-reset**: each `set()` releases exactly one waiter. With no
///   waiter queued, the handle stays set until one `wait()` consumes it.
/// - **manual-reset**: `set()` releases every queued waiter and the handle
///   stays set until [`reset`](Self::reset).
///
/// Clones share the same event. Every operation on a handle is one critical
/// section, so a handle may be shared freely between threads.
///
/// # Examples
///
/// ```rust,ignore
/// let ready = WaitHandle::new(false, false);
///
/// let waiter = ready.clone();
/// concord::task::spawn(async move {
///     waiter.wait().await.unwrap();
///     println!("released");
/// });
///
/// ready.set();
/// ```
#[derive(Clone)]
pub struct WaitHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    auto_reset: bool,
    state: Mutex<HandleState>,
}

struct HandleState {
    is_set: bool,
    waiters: Queue<Waiter>,
}

impl WaitHandle {
    /// Creates a handle with the given reset mode and initial state.
    pub fn new(auto_reset: bool, initial_state: bool) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                auto_reset,
                state: Mutex::new(HandleState {
                    is_set: initial_state,
                    waiters: Queue::new(),
                }),
            }),
        }
    }

    pub fn is_auto_reset(&self) -> bool {
        self.inner.auto_reset
    }

    /// Returns whether the handle is currently set.
    ///
    /// The answer may be stale by the time the caller acts on it.
    pub fn is_set(&self) -> bool {
        self.inner.state.lock().is_set
    }

    /// Signals the handle.
    ///
    /// Queued waiters are completed in FIFO order, skipping those already
    /// complete (abandoned, or won through another handle by
    /// [`when_any`](Self::when_any)). An auto-reset handle stops after the
    /// first waiter it actually completes and stays unset. Otherwise the
    /// handle ends up set.
    ///
    /// Waiter continuations are never run from inside `set()`; they resume on
    /// a later turn of the scheduler.
    pub fn set(&self) {
        let mut state = self.inner.state.lock();

        while let Some(waiter) = state.waiters.dequeue() {
            if waiter.try_set_complete() && self.inner.auto_reset {
                return;
            }
        }

        state.is_set = true;
    }

    /// Clears the set state. Queued waiters are untouched.
    pub fn reset(&self) {
        self.inner.state.lock().is_set = false;
    }

    /// Waits for the handle to be set.
    ///
    /// The wait is registered immediately. If the handle is already set the
    /// returned future is ready, and an auto-reset handle is unset again.
    ///
    /// The output is `Err` only if the waiter is cancelled, which nothing in
    /// this crate does on its own.
    pub fn wait(&self) -> Wait {
        let mut state = self.inner.state.lock();

        if state.is_set {
            if self.inner.auto_reset {
                state.is_set = false;
            }
            return Wait::ready();
        }

        let waiter = Waiter::new();
        state.waiters.enqueue(waiter.clone());

        Wait::pending(waiter)
    }

    /// Offers the handle to a shared `waiter`, on behalf of
    /// [`when_any`](Self::when_any).
    ///
    /// If the handle is set the waiter is completed, consuming the signal of
    /// an auto-reset handle only when this call is the one that completed
    /// it. Otherwise the waiter is enqueued. Returns `true` if the handle
    /// was set.
    fn offer(&self, waiter: &Waiter) -> bool {
        let mut state = self.inner.state.lock();

        if state.is_set {
            if waiter.try_set_complete() && self.inner.auto_reset {
                state.is_set = false;
            }
            return true;
        }

        state.waiters.enqueue(waiter.clone());
        false
    }

    /// Consumes the signal of a set handle without registering anything.
    fn try_take(&self) -> bool {
        let mut state = self.inner.state.lock();

        if !state.is_set {
            return false;
        }

        if self.inner.auto_reset {
            state.is_set = false;
        }
        true
    }

    /// Waits until any of `handles` is set, or `timeout` elapses.
    ///
    /// A first pass checks the handles in order and completes right away on
    /// the first set one, consuming it if it auto-resets. Otherwise a single
    /// waiter is shared by all handles and by an internal one-shot timer when
    /// `timeout` is given and non-zero. A zero timeout means no timeout. Whichever completes it first wins; the others find
    /// it complete and leave their own state untouched.
    ///
    /// The output does not say which handle (or the timeout) won.
    ///
    /// A losing handle keeps the shared waiter in its queue until its next
    /// `set()` discards it. Racing the same long-lived handles at a high rate
    /// therefore grows their queues between signals.
    ///
    /// With no handles and no (or a zero) timeout the future never completes.
    pub fn when_any(handles: &[&WaitHandle], timeout: Option<Duration>) -> WhenAny {
        if handles.iter().any(|handle| handle.try_take()) {
            return WhenAny {
                wait: Wait::ready(),
                timeout: None,
            };
        }

        let waiter = Waiter::new();
        let wait = Wait::pending(waiter.clone());

        for handle in handles {
            if handle.offer(&waiter) {
                return WhenAny { wait, timeout: None };
            }
        }

        let timer = timeout.filter(|timeout| !timeout.is_zero()).map(|timeout| {
            let timer = TimerEvent::new(timeout, false);
            timer.offer(&waiter);
            timer
        });

        WhenAny {
            wait,
            timeout: timer,
        }
    }

    /// Number of waiters queued on this handle, including completed ones not
    /// yet discarded.
    pub fn queued_waiters(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }
}

impl fmt::Debug for WaitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();

        f.debug_struct("WaitHandle")
            .field("auto_reset", &self.inner.auto_reset)
            .field("is_set", &state.is_set)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

/// Future returned by [`WaitHandle::when_any`].
///
/// Dropping it abandons the shared waiter and cancels the timeout timer.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WhenAny {
    wait: Wait,
    timeout: Option<TimerEvent>,
}

impl Future for WhenAny {
    type Output = Result<(), WaitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.wait).poll(cx)
    }
}

impl fmt::Debug for WhenAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhenAny")
            .field("wait", &self.wait)
            .field("has_timeout", &self.timeout.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_reset_set_with_no_waiters_is_consumed_once() {
        let event = WaitHandle::new(true, false);
        event.set();
        assert!(event.is_set());

        assert!(event.wait().is_complete());
        assert!(!event.is_set());
        assert!(!event.wait().is_complete());
    }

    #[test]
    fn test_auto_reset_releases_one_waiter_per_set_in_fifo_order() {
        let event = WaitHandle::new(true, false);

        let first = event.wait();
        let second = event.wait();
        let third = event.wait();

        event.set();
        assert!(first.is_complete());
        assert!(!second.is_complete());
        assert!(!third.is_complete());
        assert!(!event.is_set());

        event.set();
        assert!(second.is_complete());
        assert!(!third.is_complete());

        event.set();
        assert!(third.is_complete());
        assert!(!event.is_set());

        event.set();
        assert!(event.is_set());
    }

    #[test]
    fn test_manual_reset_releases_everyone_and_stays_set() {
        let event = WaitHandle::new(false, false);

        let waits: Vec<Wait> = (0..3).map(|_| event.wait()).collect();
        event.set();

        assert!(waits.iter().all(Wait::is_complete));
        assert!(event.is_set());
        assert!(event.wait().is_complete());
        assert!(event.wait().is_complete());

        event.reset();
        assert!(!event.is_set());
        assert!(!event.wait().is_complete());
    }

    #[test]
    fn test_set_skips_abandoned_waiters() {
        let event = WaitHandle::new(true, false);

        let dropped = event.wait();
        let kept = event.wait();
        drop(dropped);

        event.set();
        assert!(kept.is_complete());
        assert!(!event.is_set());
    }

    #[test]
    fn test_initial_state_is_honored() {
        assert!(WaitHandle::new(true, true).is_set());
        assert!(!WaitHandle::new(false, false).is_set());
    }

    #[test]
    fn test_when_any_fast_path_consumes_first_set_handle() {
        let a = WaitHandle::new(true, false);
        let b = WaitHandle::new(true, true);
        let c = WaitHandle::new(true, true);

        let race = WaitHandle::when_any(&[&a, &b, &c], None);

        assert!(race.wait.is_complete());
        assert!(!b.is_set());
        assert!(c.is_set());
        assert_eq!(a.queued_waiters(), 0);
    }

    #[test]
    fn test_when_any_completes_once_and_leaves_losers_set() {
        let a = WaitHandle::new(true, false);
        let b = WaitHandle::new(true, false);

        let race = WaitHandle::when_any(&[&a, &b], None);
        assert!(!race.wait.is_complete());
        assert_eq!(a.queued_waiters(), 1);
        assert_eq!(b.queued_waiters(), 1);

        b.set();
        assert!(race.wait.is_complete());
        assert!(!b.is_set());

        // The shared waiter lingers on `a` and is skipped by its next set.
        a.set();
        assert!(a.is_set());
        assert_eq!(a.queued_waiters(), 0);
    }

    #[test]
    fn test_when_any_zero_timeout_arms_no_timer() {
        let a = WaitHandle::new(true, false);

        let race = WaitHandle::when_any(&[&a], Some(Duration::ZERO));

        assert!(race.timeout.is_none());
        assert!(!race.wait.is_complete());
        assert_eq!(a.queued_waiters(), 1);
    }
}
