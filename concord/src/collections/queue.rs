use std::collections::VecDeque;
use std::collections::vec_deque;

/// A first-in, first-out queue.
///
/// `Queue<T>` is a thin wrapper over a [`VecDeque`] that only exposes
/// the FIFO operations used by the coordination primitives: values are
/// appended at the back and removed from the front.
#[derive(Debug)]
pub struct Queue<T> {
    /// Queued values, head at the front.
    values: VecDeque<T>,
}

impl<T> Queue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            values: VecDeque::new(),
        }
    }

    /// Appends a value at the back of the queue.
    pub fn enqueue(&mut self, value: T) {
        self.values.push_back(value);
    }

    /// Removes and returns the value at the head of the queue.
    ///
    /// Returns `None` if the queue is empty.
    pub fn dequeue(&mut self) -> Option<T> {
        self.values.pop_front()
    }

    /// Returns the value at the head of the queue without removing it.
    pub fn try_peek(&self) -> Option<&T> {
        self.values.front()
    }

    /// Returns the number of queued values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the queue holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the queued values from head to tail.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.values.iter()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = Queue::new();
        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_peek(), Some(&1));
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_iter_preserves_order() {
        let mut queue = Queue::new();
        for n in 0..5 {
            queue.enqueue(n);
        }

        let values: Vec<_> = queue.iter().copied().collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }
}
