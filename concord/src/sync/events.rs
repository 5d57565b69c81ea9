use super::WaitHandle;

use std::ops::Deref;

/// A [`WaitHandle`] in auto-reset mode.
///
/// Each `set()` releases a single waiter, or is held until the next
/// `wait()` when nobody is waiting.
#[derive(Clone, Debug)]
pub struct AutoResetEvent(WaitHandle);

/// A [`WaitHandle`] in manual-reset mode.
///
/// Once set, every current and future `wait()` completes until `reset()`.
#[derive(Clone, Debug)]
pub struct ManualResetEvent(WaitHandle);

impl AutoResetEvent {
    pub fn new(initial_state: bool) -> Self {
        Self(WaitHandle::new(true, initial_state))
    }

    /// Borrows the underlying handle, e.g. to pass it to
    /// [`WaitHandle::when_any`].
    pub fn as_handle(&self) -> &WaitHandle {
        &self.0
    }
}

impl ManualResetEvent {
    pub fn new(initial_state: bool) -> Self {
        Self(WaitHandle::new(false, initial_state))
    }

    pub fn as_handle(&self) -> &WaitHandle {
        &self.0
    }
}

impl Default for AutoResetEvent {
    /// An unset auto-reset event.
    fn default() -> Self {
        Self::new(false)
    }
}

impl Default for ManualResetEvent {
    /// An unset manual-reset event.
    fn default() -> Self {
        Self::new(false)
    }
}

impl Deref for AutoResetEvent {
    type Target = WaitHandle;

    fn deref(&self) -> &WaitHandle {
        &self.0
    }
}

impl Deref for ManualResetEvent {
    type Target = WaitHandle;

    fn deref(&self) -> &WaitHandle {
        &self.0
    }
}

impl From<AutoResetEvent> for WaitHandle {
    fn from(event: AutoResetEvent) -> Self {
        event.0
    }
}

impl From<ManualResetEvent> for WaitHandle {
    fn from(event: ManualResetEvent) -> Self {
        event.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_pick_the_reset_mode() {
        assert!(AutoResetEvent::default().is_auto_reset());
        assert!(!ManualResetEvent::default().is_auto_reset());
        assert!(AutoResetEvent::new(true).is_set());
        assert!(ManualResetEvent::new(true).is_set());
    }
}
