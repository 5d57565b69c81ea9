use super::Queue;

use std::collections::BTreeMap;

/// A priority queue of FIFO buckets.
///
/// Priorities are non-negative integers where `0` is the highest priority.
/// Each priority level owns its own [`Queue`], created on first use and
/// dropped once it runs dry, so items of equal priority come out in the
/// order they went in. Levels are kept sparse: any `usize` is a valid
/// priority and only levels holding items take up memory.
///
/// The queue tracks the highest priority level that may still hold items.
/// Dequeuing starts its scan from that cursor and moves it forward as levels
/// run dry; an enqueue at a higher level pulls it back.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    /// Non-empty buckets keyed by priority.
    queues: BTreeMap<usize, Queue<T>>,

    /// Lowest-numbered level that may hold an item.
    highest_priority: usize,

    /// Total number of queued items across all levels.
    count: usize,
}

impl<T> PriorityQueue<T> {
    /// Creates an empty priority queue.
    pub fn new() -> Self {
        Self {
            queues: BTreeMap::new(),
            highest_priority: 0,
            count: 0,
        }
    }

    /// Enqueues `item` at `priority`.
    pub fn enqueue(&mut self, item: T, priority: usize) {
        self.queues.entry(priority).or_default().enqueue(item);

        self.highest_priority = self.highest_priority.min(priority);
        self.count += 1;
    }

    /// Removes the next item: the oldest item of the highest priority level.
    ///
    /// Returns `None` once the queue is empty.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }

        let (&priority, queue) = self.queues.range_mut(self.highest_priority..).next()?;
        let item = queue.dequeue();

        if queue.is_empty() {
            self.queues.remove(&priority);
            self.highest_priority = priority.saturating_add(1);
        } else {
            self.highest_priority = priority;
        }

        if item.is_some() {
            self.count -= 1;
        }
        item
    }

    /// Returns the number of queued items.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no items are queued.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequeue_empty_returns_none() {
        let mut queue: PriorityQueue<u32> = PriorityQueue::new();

        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_lower_priority_value_dequeues_first() {
        let mut queue = PriorityQueue::new();
        queue.enqueue("low", 1);
        queue.enqueue("high", 0);

        assert_eq!(queue.dequeue(), Some("high"));
        assert_eq!(queue.dequeue(), Some("low"));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_equal_priorities_are_fifo() {
        let mut queue = PriorityQueue::new();
        for n in 0..10 {
            queue.enqueue(n, 3);
        }

        for n in 0..10 {
            assert_eq!(queue.dequeue(), Some(n));
        }
    }

    #[test]
    fn test_interleaved_enqueues_follow_priority_then_arrival() {
        let mut queue = PriorityQueue::new();
        let inputs = [(0, 2), (1, 0), (2, 4), (3, 2), (4, 0), (5, 1), (6, 4)];
        for (item, priority) in inputs {
            queue.enqueue(item, priority);
        }

        let mut expected = inputs.to_vec();
        expected.sort_by_key(|&(item, priority)| (priority, item));

        let drained: Vec<_> = std::iter::from_fn(|| queue.dequeue()).collect();
        let expected: Vec<_> = expected.into_iter().map(|(item, _)| item).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn test_reenqueue_at_higher_priority_after_cursor_advanced() {
        let mut queue = PriorityQueue::new();
        queue.enqueue('a', 0);
        queue.enqueue('b', 3);

        assert_eq!(queue.dequeue(), Some('a'));
        assert_eq!(queue.len(), 1);

        // The cursor has moved past level 0; a fresh enqueue must pull it back.
        queue.enqueue('c', 0);
        queue.enqueue('d', 2);

        assert_eq!(queue.dequeue(), Some('c'));
        assert_eq!(queue.dequeue(), Some('d'));
        assert_eq!(queue.dequeue(), Some('b'));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_extreme_priorities_stay_sparse() {
        let mut queue = PriorityQueue::new();
        queue.enqueue("last", usize::MAX);
        queue.enqueue("middle", 1 << 40);
        queue.enqueue("first", 0);

        assert_eq!(queue.dequeue(), Some("first"));
        assert_eq!(queue.dequeue(), Some("middle"));
        assert_eq!(queue.dequeue(), Some("last"));
        assert_eq!(queue.dequeue(), None);

        queue.enqueue("again", usize::MAX);
        assert_eq!(queue.dequeue(), Some("again"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_count_tracks_enqueues_minus_dequeues() {
        let mut queue = PriorityQueue::new();
        for n in 0..20usize {
            queue.enqueue(n, n % 5);
        }
        assert_eq!(queue.len(), 20);

        for remaining in (0..20).rev() {
            assert!(queue.dequeue().is_some());
            assert_eq!(queue.len(), remaining);
        }

        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(), None);
    }
}
