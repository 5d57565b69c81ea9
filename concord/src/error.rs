use thiserror::Error;

/// Error surfaced by a pending wait.
///
/// Waits only fail when their waiter is cancelled through
/// [`Waiter::try_set_canceled`](crate::sync::Waiter::try_set_canceled).
/// Nothing in this crate cancels waiters on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("operation cancelled")]
    Canceled,
}

/// Error produced while reading runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}: unknown host flavor `{value}` (expected `event_loop` or `thread_pool`)")]
    InvalidFlavor { var: &'static str, value: String },

    #[error("{var}: `{value}` is not a valid number")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var}: worker thread count must be greater than zero")]
    ZeroWorkers { var: &'static str },
}
