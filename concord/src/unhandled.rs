//! Process-wide channel for errors nobody is waiting on.
//!
//! Scheduled lambdas, host callbacks and fire-and-forget futures have no
//! caller to return an error to. Whatever they fail with (a panic or an
//! `Err`) is caught at the dispatch boundary and funneled here instead of
//! unwinding through the scheduler.
//!
//! Reports are logged with `tracing::error!`, retained in a bounded history,
//! and forwarded to every registered handler.
//!
//! ```rust,ignore
//! concord::unhandled::register_handler(
//!     |err| eprintln!("background failure: {err}"),
//!     true,
//! );
//! ```

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::Any;
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Maximum number of reports kept for replay to late handlers.
pub const MAX_RETAINED_ERRORS: usize = 256;

/// Where an unhandled error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A callback or scheduled lambda panicked.
    Panic,

    /// A fire-and-forget future resolved to `Err`.
    ScheduledFailure,

    /// Reported explicitly through [`report_error`].
    Reported,
}

impl ErrorKind {
    fn label(self) -> &'static str {
        match self {
            ErrorKind::Panic => "Unhandled Panic",
            ErrorKind::ScheduledFailure => "Scheduled Task Failure",
            ErrorKind::Reported => "Reported Error",
        }
    }
}

/// Details of one unhandled error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledError {
    pub kind: ErrorKind,
    pub message: String,

    /// Extra context, such as the source chain of an `anyhow::Error`.
    pub detail: Option<String>,
}

impl fmt::Display for UnhandledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;

        if let Some(detail) = &self.detail {
            write!(f, "\n{detail}")?;
        }

        Ok(())
    }
}

type Handler = Arc<dyn Fn(&UnhandledError) + Send + Sync>;

struct Registry {
    errors: VecDeque<UnhandledError>,
    handlers: Vec<Handler>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| {
    Mutex::new(Registry {
        errors: VecDeque::new(),
        handlers: Vec::new(),
    })
});

thread_local! {
    /// Set while a handler failure is being re-reported on this thread.
    static IN_HANDLER_FAILURE: Cell<bool> = const { Cell::new(false) };
}

/// Reports an error from a `catch`-style block that has nowhere else to go.
pub fn report_error(error: impl fmt::Display) {
    report(ErrorKind::Reported, error.to_string(), None);
}

/// Registers a handler that receives every subsequent report.
///
/// If `send_queued` is `true`, the retained history is replayed to the
/// handler before this function returns.
pub fn register_handler<F>(handler: F, send_queued: bool)
where
    F: Fn(&UnhandledError) + Send + Sync + 'static,
{
    let handler: Handler = Arc::new(handler);

    let queued: Vec<UnhandledError> = {
        let mut registry = REGISTRY.lock();
        registry.handlers.push(handler.clone());

        if send_queued {
            registry.errors.iter().cloned().collect()
        } else {
            Vec::new()
        }
    };

    for error in &queued {
        invoke(&handler, error);
    }
}

/// Returns a copy of the retained reports, oldest first.
pub fn retained_errors() -> Vec<UnhandledError> {
    REGISTRY.lock().errors.iter().cloned().collect()
}

pub(crate) fn report(kind: ErrorKind, message: String, detail: Option<String>) {
    let error = UnhandledError {
        kind,
        message,
        detail,
    };

    tracing::error!(kind = ?error.kind, "{error}");

    let handlers = {
        let mut registry = REGISTRY.lock();

        if registry.errors.len() == MAX_RETAINED_ERRORS {
            registry.errors.pop_front();
        }
        registry.errors.push_back(error.clone());

        registry.handlers.clone()
    };

    for handler in &handlers {
        invoke(handler, &error);
    }
}

/// Reports a caught panic payload.
pub(crate) fn report_panic(payload: Box<dyn Any + Send>) {
    report(ErrorKind::Panic, panic_message(payload.as_ref()), None);
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn invoke(handler: &Handler, error: &UnhandledError) {
    let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(error))) else {
        return;
    };

    let message = format!(
        "unhandled error handler panicked: {}",
        panic_message(payload.as_ref())
    );

    // One level of re-reporting only; a handler that panics on its own
    // failure report would otherwise recurse forever.
    if IN_HANDLER_FAILURE.with(|flag| flag.replace(true)) {
        tracing::error!("{message}");
        return;
    }

    report(ErrorKind::Reported, message, Some(error.to_string()));
    IN_HANDLER_FAILURE.with(|flag| flag.set(false));
}
