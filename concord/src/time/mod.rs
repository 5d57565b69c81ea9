//! Timer-based suspension.
//!
//! - [`delay`] suspends the current task for a duration, backed by a
//!   one-shot [`TimerEvent`](crate::sync::TimerEvent).

mod delay;

#[doc(inline)]
pub use delay::{Delay, delay};
