//! Cooperative, priority-ordered lambda scheduling.
//!
//! The [`TaskScheduler`] keeps one [`PriorityQueue`](crate::collections::PriorityQueue)
//! of lambdas and drains it from the host, one lambda per host turn. Host
//! events queued in between therefore run between scheduled lambdas.
//!
//! [`yield_now`] suspends the current task until the scheduler reaches a
//! lambda at the chosen priority, which lets long-running work cede control
//! without leaving the priority order.

mod task_scheduler;
mod yield_now;

pub use task_scheduler::TaskScheduler;
pub use yield_now::{YieldNow, yield_now};
