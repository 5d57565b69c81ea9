use super::host::Callback;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

/// Heap size below which cancelled entries are only pruned from the top.
const MIN_PURGE_LEN: usize = 64;

/// An entry in a host timer queue.
///
/// `TimerEntry` represents a callback scheduled for a specific deadline.
/// Entries are stored in a binary heap ordered by deadline, then by
/// registration order so that timers sharing a deadline fire FIFO.
///
/// The entry may be cancelled before it fires.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    deadline: Instant,

    /// Registration sequence number, used as a tie-breaker.
    seq: u64,

    /// Callback to hand to the host once the deadline is reached.
    callback: Callback,

    /// Cancellation flag shared with the [`TimerHandle`](super::TimerHandle).
    cancelled: Arc<AtomicBool>,
}

impl TimerEntry {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then sequence.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap,
    /// where the earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deadline-ordered set of pending timer callbacks.
///
/// The queue itself never runs anything; the owning host pops due callbacks
/// and feeds them into its normal run queue.
///
/// Cancelled entries buried below the top are swept out whenever the heap
/// doubles in size since the last sweep, so a timer cancelled long before
/// its deadline does not keep its callback alive until then.
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,

    /// Heap size at which the next sweep runs.
    purge_at: usize,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            purge_at: MIN_PURGE_LEN,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Registers `callback` for `deadline`.
    ///
    /// Returns the cancelled entries swept out along the way, so the caller
    /// can drop them outside of any lock.
    #[must_use]
    pub(crate) fn push(
        &mut self,
        deadline: Instant,
        callback: Callback,
        cancelled: Arc<AtomicBool>,
    ) -> Vec<TimerEntry> {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(TimerEntry {
            deadline,
            seq,
            callback,
            cancelled,
        });

        if self.len() >= self.purge_at {
            self.purge_cancelled()
        } else {
            Vec::new()
        }
    }

    /// Removes every cancelled entry, wherever it sits in the heap.
    fn purge_cancelled(&mut self) -> Vec<TimerEntry> {
        let (swept, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .partition(TimerEntry::is_cancelled);

        self.heap = BinaryHeap::from(live);
        self.purge_at = (self.len() * 2).max(MIN_PURGE_LEN);

        tracing::trace!(purged = swept.len(), "swept cancelled timers");
        swept
    }

    /// Removes every entry due at `now`, returning the live callbacks in
    /// firing order. Cancelled entries are discarded.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Vec<Callback> {
        let mut due = Vec::new();

        while self.heap.peek().is_some_and(|entry| entry.deadline <= now) {
            if let Some(entry) = self.heap.pop() {
                if !entry.is_cancelled() {
                    due.push(entry.callback);
                }
            }
        }

        due
    }

    /// Returns the earliest live deadline, pruning cancelled entries on top.
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while self.heap.peek().is_some_and(TimerEntry::is_cancelled) {
            self.heap.pop();
        }

        self.heap.peek().map(|entry| entry.deadline)
    }

    /// Removes every entry, returning them so the caller can drop them
    /// outside of any lock.
    pub(crate) fn take_all(&mut self) -> Vec<TimerEntry> {
        std::mem::take(&mut self.heap).into_vec()
    }
}
