//! Queues used by the scheduler and the wait handles.
//!
//! - [`Queue`]: a plain FIFO queue.
//! - [`PriorityQueue`]: FIFO buckets indexed by priority, `0` first.

mod priority_queue;
mod queue;

pub use priority_queue::PriorityQueue;
pub use queue::Queue;
