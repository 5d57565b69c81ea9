use super::WaitHandle;
use crate::runtime::context::current_host;
use crate::runtime::{Host, TimerHandle};

use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A [`WaitHandle`] that sets itself after a delay.
///
/// A one-shot timer (`repeat == false`) is a manual-reset handle: once it
/// fires, every `wait()` completes. A repeating timer is an auto-reset
/// handle that sets itself every `delay`, so each tick releases one wait.
///
/// The timer is armed on the current host as soon as it is created.
/// [`dispose`](Self::dispose), or dropping the event, stops any future
/// firing. A wait still pending at that point is never completed.
///
/// # Examples
///
/// ```rust,ignore
/// let tick = TimerEvent::new(Duration::from_millis(100), true);
///
/// loop {
///     tick.wait().await?;
///     groom_pool();
/// }
/// ```
pub struct TimerEvent {
    handle: WaitHandle,
    state: Arc<TimerState>,
    delay: Duration,
    repeat: bool,
}

struct TimerState {
    disposed: AtomicBool,

    /// Registration of the next firing.
    registration: Mutex<Option<TimerHandle>>,
}

impl TimerEvent {
    /// Creates and arms a timer on the current host.
    pub fn new(delay: Duration, repeat: bool) -> Self {
        Self::with_host(current_host(), delay, repeat)
    }

    /// Creates and arms a timer on `host`.
    pub fn with_host(host: Arc<dyn Host>, delay: Duration, repeat: bool) -> Self {
        let handle = WaitHandle::new(repeat, false);
        let state = Arc::new(TimerState {
            disposed: AtomicBool::new(false),
            registration: Mutex::new(None),
        });

        let period = repeat.then_some(delay);
        arm(host, handle.clone(), state.clone(), Instant::now() + delay, period);

        Self {
            handle,
            state,
            delay,
            repeat,
        }
    }

    /// Stops the timer. Idempotent.
    pub fn dispose(&self) {
        self.state.disposed.store(true, Ordering::Release);

        if let Some(registration) = self.state.registration.lock().take() {
            registration.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_repeating(&self) -> bool {
        self.repeat
    }

    pub fn as_handle(&self) -> &WaitHandle {
        &self.handle
    }
}

/// Registers the next firing at `deadline`.
///
/// Repeating timers re-arm from the previous deadline so ticks do not drift
/// with callback latency. A tick that is already overdue is skipped.
fn arm(
    host: Arc<dyn Host>,
    handle: WaitHandle,
    state: Arc<TimerState>,
    deadline: Instant,
    period: Option<Duration>,
) {
    let delay = deadline.saturating_duration_since(Instant::now());
    let fire_state = state.clone();
    let fire_host = host.clone();

    let registration = host.defer_after(
        delay,
        Box::new(move || {
            if fire_state.disposed.load(Ordering::Acquire) {
                return;
            }

            tracing::trace!(repeating = period.is_some(), "timer event fired");
            handle.set();

            if let Some(period) = period {
                let now = Instant::now();
                let mut next = deadline + period;
                if next <= now {
                    next = now + period;
                }

                arm(fire_host, handle, fire_state, next, Some(period));
            }
        }),
    );

    let mut slot = state.registration.lock();
    if state.disposed.load(Ordering::Acquire) {
        registration.cancel();
    } else {
        *slot = Some(registration);
    }
}

impl Deref for TimerEvent {
    type Target = WaitHandle;

    fn deref(&self) -> &WaitHandle {
        &self.handle
    }
}

impl Drop for TimerEvent {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEvent")
            .field("delay", &self.delay)
            .field("repeat", &self.repeat)
            .field("disposed", &self.is_disposed())
            .field("is_set", &self.handle.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::EventLoop;
    use std::thread;

    #[test]
    fn test_one_shot_timer_sets_and_stays_set() {
        let event_loop = EventLoop::start();
        let timer = TimerEvent::with_host(event_loop.handle(), Duration::from_millis(20), false);

        assert!(!timer.is_auto_reset());
        assert!(!timer.is_set());

        thread::sleep(Duration::from_millis(200));

        assert!(timer.is_set());
        assert!(timer.wait().is_complete());
        assert!(timer.is_set());
    }

    #[test]
    fn test_disposed_timer_never_fires() {
        let event_loop = EventLoop::start();
        let timer = TimerEvent::with_host(event_loop.handle(), Duration::from_millis(20), false);

        timer.dispose();
        timer.dispose();
        assert!(timer.is_disposed());

        thread::sleep(Duration::from_millis(100));
        assert!(!timer.is_set());
    }

    #[test]
    fn test_repeating_timer_is_auto_reset_and_refires() {
        let event_loop = EventLoop::start();
        let timer = TimerEvent::with_host(event_loop.handle(), Duration::from_millis(10), true);
        assert!(timer.is_auto_reset());

        thread::sleep(Duration::from_millis(100));
        assert!(timer.wait().is_complete());

        thread::sleep(Duration::from_millis(100));
        assert!(timer.wait().is_complete());
    }
}
