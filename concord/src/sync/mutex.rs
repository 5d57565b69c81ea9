use super::AutoResetEvent;
use super::waiter::Wait;
use crate::error::WaitError;

use std::cell::UnsafeCell;
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

/// An asynchronous lock without associated data.
///
/// `lock()` tries to flip the lock flag and, when the lock is taken, waits
/// on an auto-reset event that `unlock()` sets. A woken locker retries the
/// flag instead of assuming ownership, so any contender may win the race
/// after an `unlock()`: the lock is **not** FIFO-fair.
///
/// Calling `unlock()` without holding the lock is a caller bug and is not
/// detected. Prefer [`Mutex`], whose guard makes that impossible.
pub struct AsyncMutex {
    /// Indicates whether the lock is currently held.
    is_locked: AtomicBool,

    /// Set on every unlock to release one waiting `lock()`.
    unlocked: AutoResetEvent,
}

impl AsyncMutex {
    /// Creates an unlocked mutex.
    pub fn new() -> Self {
        Self {
            is_locked: AtomicBool::new(false),
            unlocked: AutoResetEvent::new(false),
        }
    }

    /// Acquires the lock, suspending while another holder has it.
    ///
    /// Fails only if the underlying wait is cancelled, which this crate
    /// never does on its own.
    pub fn lock(&self) -> Lock<'_> {
        Lock {
            mutex: self,
            wait: None,
        }
    }

    /// Acquires the lock if it is free.
    pub fn try_lock(&self) -> bool {
        self.is_locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock and lets one waiting `lock()` retry.
    pub fn unlock(&self) {
        self.is_locked.store(false, Ordering::Release);
        self.unlocked.set();
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked.load(Ordering::Acquire)
    }
}

/// Future returned by [`AsyncMutex::lock`].
///
/// An `unlock()` releases one pending `Lock`. If that `Lock` is dropped
/// before it retries the lock flag, it sets the unlock event again so the
/// next contender is released instead.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Lock<'a> {
    mutex: &'a AsyncMutex,

    /// Wait on the unlock event, present between a failed attempt and the
    /// next retry.
    wait: Option<Wait>,
}

impl Future for Lock<'_> {
    type Output = Result<(), WaitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            if let Some(wait) = this.wait.as_mut() {
                let outcome = std::task::ready!(Pin::new(wait).poll(cx));
                this.wait = None;
                outcome?;
            }

            if this.mutex.try_lock() {
                return Poll::Ready(Ok(()));
            }

            this.wait = Some(this.mutex.unlocked.wait());
        }
    }
}

impl Drop for Lock<'_> {
    fn drop(&mut self) {
        if let Some(wait) = self.wait.take() {
            if !wait.abandon() {
                self.mutex.unlocked.set();
            }
        }
    }
}

impl fmt::Debug for Lock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("waiting", &self.wait.is_some())
            .finish()
    }
}

impl Default for AsyncMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsyncMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMutex")
            .field("is_locked", &self.is_locked())
            .finish()
    }
}

/// An asynchronous mutex protecting a value.
///
/// `Mutex<T>` provides mutual exclusion for async tasks. Unlike
/// a standard `std::sync::Mutex`, this mutex does not block threads
/// when waiting; tasks that cannot acquire the lock are suspended
/// and woken up when the mutex becomes available.
///
/// Locking follows [`AsyncMutex`] and is not FIFO-fair.
pub struct Mutex<T> {
    raw: AsyncMutex,

    /// The underlying data protected by the mutex.
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `raw`.
unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    /// Creates a new mutex wrapping the given value.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mutex = Mutex::new(42);
    /// ```
    pub fn new(value: T) -> Mutex<T> {
        Self {
            raw: AsyncMutex::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the mutex, returning a guard that releases it on drop.
    ///
    /// This does **not block the thread**. Instead, the task is suspended until
    /// the mutex becomes available.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut guard = mutex.lock().await?;
    /// *guard += 1;
    /// ```
    pub async fn lock(&self) -> Result<MutexGuard<'_, T>, WaitError> {
        self.raw.lock().await?;

        Ok(MutexGuard { mutex: self })
    }

    /// Acquires the mutex if it is free.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.raw.try_lock().then_some(MutexGuard { mutex: self })
    }

    /// Returns a mutable reference to the value, which needs no locking
    /// since the borrow is exclusive.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("is_locked", &self.raw.is_locked())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`Mutex::lock`].
///
/// Releases the mutex when dropped.
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.raw.unlock();
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.data.get() }
    }
}
