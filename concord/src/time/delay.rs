use crate::sync::{TimerEvent, Wait};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Creates a future that completes after the given duration.
///
/// A zero duration completes on first poll without touching the host
/// timer queue. Otherwise a one-shot [`TimerEvent`] is armed on the current
/// host when the future is first polled.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// delay(Duration::from_millis(10)).await;
/// ```
pub fn delay(duration: Duration) -> Delay {
    Delay {
        duration,
        timer: None,
    }
}

/// Future returned by [`delay`].
///
/// Dropping it before completion disposes the timer.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Delay {
    duration: Duration,

    /// Armed timer and the wait registered on it.
    timer: Option<(TimerEvent, Wait)>,
}

impl Future for Delay {
    /// The delay future produces no value.
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.duration.is_zero() {
            return Poll::Ready(());
        }

        let (_, wait) = this.timer.get_or_insert_with(|| {
            let timer = TimerEvent::new(this.duration, false);
            let wait = timer.wait();
            (timer, wait)
        });

        // The wait belongs to this future alone, so it can only complete.
        Pin::new(wait).poll(cx).map(|_| ())
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delay")
            .field("duration", &self.duration)
            .field("armed", &self.timer.is_some())
            .finish()
    }
}
