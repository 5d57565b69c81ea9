//! Thread-pool host implementation.
//!
//! It is composed of:
//! - [`core`]: the pool itself, its timer thread and lifecycle management,
//! - [`worker`]: worker threads that run callbacks using work-stealing.

pub(crate) mod core;
pub(crate) mod worker;

pub use self::core::ThreadPool;
