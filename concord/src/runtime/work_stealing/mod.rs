//! Work-stealing queues used by the thread-pool host.
//!
//! It consists of:
//! - [`injector`]: a global queue for callbacks deferred from outside the
//!   pool, also used to park idle workers,
//! - [`queue`]: per-worker local queues for callbacks deferred by a worker
//!   itself, which idle workers may steal from.

pub(crate) mod injector;
pub(crate) mod queue;
