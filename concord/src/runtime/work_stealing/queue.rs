use crate::runtime::host::Callback;

use parking_lot::Mutex;
use std::collections::VecDeque;

/// A per-worker local callback queue.
///
/// The owning worker pushes to the back and pops from the front, so
/// callbacks a worker defers to itself keep their FIFO order.
///
/// Other workers steal from the back, taking the most recently deferred
/// callback and leaving the owner's oldest work in place.
pub(crate) struct LocalQueue {
    inner: Mutex<VecDeque<Callback>>,
}

impl LocalQueue {
    /// Creates an empty local queue.
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, callback: Callback) {
        self.inner.lock().push_back(callback);
    }

    /// Pops the oldest callback, for use by the owning worker.
    pub(crate) fn pop(&self) -> Option<Callback> {
        self.inner.lock().pop_front()
    }

    /// Steals the newest callback, for use by other workers.
    pub(crate) fn steal(&self) -> Option<Callback> {
        self.inner.lock().pop_back()
    }

    pub(crate) fn drain(&self) -> Vec<Callback> {
        self.inner.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tagged(log: &Arc<Mutex<Vec<u8>>>, tag: u8) -> Callback {
        let log = log.clone();
        Box::new(move || log.lock().push(tag))
    }

    #[test]
    fn test_owner_pops_fifo_and_thieves_take_newest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = LocalQueue::new();

        queue.push(tagged(&log, 1));
        queue.push(tagged(&log, 2));
        queue.push(tagged(&log, 3));

        let stolen = queue.steal().unwrap();
        let first = queue.pop().unwrap();
        let second = queue.pop().unwrap();

        stolen();
        first();
        second();

        assert!(queue.pop().is_none());
        assert_eq!(*log.lock(), vec![3, 1, 2]);
    }
}
