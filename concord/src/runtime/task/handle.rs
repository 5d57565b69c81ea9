use super::Task;
use super::state::COMPLETED;

use std::fmt;
use std::panic;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// A handle to a spawned task.
///
/// A `JoinHandle` allows awaiting the result of a task spawned onto
/// a host. It implements [`Future`] and resolves once the task
/// has completed.
///
/// If the task panicked, awaiting the handle resumes that panic in the
/// awaiting code.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct JoinHandle<T> {
    /// Shared reference to the underlying task.
    pub(crate) task: Arc<Task<T>>,
}

impl<T> JoinHandle<T> {
    /// Returns `true` once the task has completed.
    pub fn is_finished(&self) -> bool {
        self.task.state.load(Ordering::Acquire) == COMPLETED
    }

    fn take_output(&self) -> T {
        // Safety: COMPLETED was observed, so the task no longer writes the
        // result, and this handle is its only reader.
        match unsafe { (*self.task.result.get()).take() } {
            Some(Ok(value)) => value,
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => panic!("JoinHandle polled after completion"),
        }
    }
}

impl<T> Future for JoinHandle<T> {
    /// The output of the spawned task.
    type Output = T;

    /// Polls the join handle.
    ///
    /// If the task has already completed, its result is returned
    /// immediately. Otherwise, the current waker is registered and
    /// the future returns `Poll::Pending`.
    ///
    /// The waker is registered **before** re-checking the task state
    /// to avoid missed wake-ups.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.is_finished() {
            return Poll::Ready(self.take_output());
        }

        {
            let mut completion = self.task.completion.lock();
            if !completion.waiters.iter().any(|w| w.will_wake(cx.waker())) {
                completion.waiters.push(cx.waker().clone());
            }
        }

        if self.is_finished() {
            return Poll::Ready(self.take_output());
        }

        Poll::Pending
    }
}

impl<T> Drop for JoinHandle<T> {
    fn drop(&mut self) {
        let mut completion = self.task.completion.lock();
        completion.detached = true;

        if self.is_finished() {
            self.task.discard_result();
        }
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}
