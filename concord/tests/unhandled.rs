mod common;

use anyhow::Context as _;
use concord::task;
use concord::unhandled::{self, ErrorKind, UnhandledError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn retained(kind: ErrorKind, message: &str) -> Option<UnhandledError> {
    unhandled::retained_errors()
        .into_iter()
        .find(|e| e.kind == kind && e.message == message)
}

#[concord::test]
async fn test_panicking_lambda_is_reported_and_draining_continues() {
    common::init_tracing();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    task::run(|| panic!("lambda failure marker"));
    task::run(move || flag.store(true, Ordering::SeqCst));

    assert!(common::eventually(|| ran.load(Ordering::SeqCst)).await);
    assert!(retained(ErrorKind::Panic, "lambda failure marker").is_some());
}

#[concord::test]
async fn test_failed_fire_and_forget_future_is_reported_with_its_causes() {
    common::init_tracing();

    task::run_async(async {
        Err::<(), _>(anyhow::anyhow!("disk full")).context("flush failure marker")
    });

    assert!(
        common::eventually(|| retained(ErrorKind::ScheduledFailure, "flush failure marker").is_some())
            .await
    );

    let error = retained(ErrorKind::ScheduledFailure, "flush failure marker").unwrap();
    assert_eq!(error.detail.as_deref(), Some("caused by: disk full"));
    assert_eq!(
        error.to_string(),
        "Scheduled Task Failure: flush failure marker\ncaused by: disk full"
    );
}

#[concord::test]
async fn test_panicking_fire_and_forget_future_is_reported() {
    common::init_tracing();

    task::run_async(async {
        concord::yield_now().await;
        panic!("future panic marker");
    });

    assert!(common::eventually(|| retained(ErrorKind::Panic, "future panic marker").is_some()).await);
}

#[concord::test]
async fn test_detached_task_panic_is_reported() {
    common::init_tracing();

    drop(task::spawn(async {
        panic!("detached panic marker");
    }));

    assert!(common::eventually(|| retained(ErrorKind::Panic, "detached panic marker").is_some()).await);
}

#[test]
fn test_late_handler_receives_queued_errors() {
    common::init_tracing();

    unhandled::report_error("queued report marker");

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    unhandled::register_handler(move |err| sink.lock().push(err.message.clone()), true);

    assert!(seen.lock().iter().any(|m| m == "queued report marker"));

    unhandled::report_error("live report marker");
    assert!(seen.lock().iter().any(|m| m == "live report marker"));
}

#[test]
fn test_handler_without_replay_only_sees_new_errors() {
    common::init_tracing();

    unhandled::report_error("before registration marker");

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    unhandled::register_handler(move |err| sink.lock().push(err.message.clone()), false);

    unhandled::report_error("after registration marker");

    let seen = seen.lock();
    assert!(!seen.iter().any(|m| m == "before registration marker"));
    assert!(seen.iter().any(|m| m == "after registration marker"));
}

#[test]
fn test_panicking_handler_is_reported_once() {
    common::init_tracing();

    unhandled::register_handler(
        |err| {
            if err.message == "handler trigger marker" {
                panic!("handler failure");
            }
        },
        false,
    );

    unhandled::report_error("handler trigger marker");

    let failure = retained(
        ErrorKind::Reported,
        "unhandled error handler panicked: handler failure",
    )
    .unwrap();
    assert_eq!(
        failure.detail.as_deref(),
        Some("Reported Error: handler trigger marker")
    );
}
