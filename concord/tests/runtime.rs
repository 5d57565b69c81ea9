mod common;

use concord::sync::ManualResetEvent;
use concord::{RuntimeBuilder, join, task};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn test_block_on_returns_the_output() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    assert_eq!(rt.block_on(async { 42 }), 42);
}

#[test]
fn test_block_on_runs_on_the_host_thread() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    let name = rt.block_on(async { std::thread::current().name().map(str::to_string) });

    assert_eq!(name.as_deref(), Some("concord-event-loop"));
}

#[test]
fn test_spawned_task_is_joined() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    let handle = rt.spawn(async {
        task::delay(Duration::from_millis(10)).await;
        "done"
    });

    assert_eq!(rt.block_on(handle), "done");
}

#[test]
fn test_dropped_join_handle_does_not_cancel_the_task() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    let done = ManualResetEvent::new(false);

    let signal = done.clone();
    drop(rt.spawn(async move {
        task::delay(Duration::from_millis(10)).await;
        signal.set();
    }));

    let waiter = done.clone();
    rt.block_on(async move { waiter.wait().await }).unwrap();
    assert!(done.is_set());
}

#[test]
#[should_panic(expected = "task failure")]
fn test_task_panic_resumes_in_block_on() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    rt.block_on(async {
        panic!("task failure");
    });
}

#[test]
fn test_block_on_from_a_host_thread_panics() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    let result = rt.block_on(async {
        std::panic::catch_unwind(|| {
            RuntimeBuilder::new().build().block_on(async {});
        })
    });

    let payload = result.unwrap_err();
    let message = payload.downcast_ref::<&str>().copied().unwrap_or_default();
    assert_eq!(message, "block_on cannot be called from a host thread");
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_zero_worker_threads_is_rejected() {
    RuntimeBuilder::new().worker_threads(0);
}

#[test]
fn test_join_single_future() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    let result = rt.block_on(async { join!(async { 42 }) });

    assert_eq!(result, 42);
}

#[test]
fn test_join_different_types_with_trailing_comma() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    let result = rt.block_on(async {
        join!(async { 100i32 }, async { String::from("test") }, async { vec![1, 2, 3] },)
    });

    assert_eq!(result, (100, String::from("test"), vec![1, 2, 3]));
}

#[test]
fn test_join_polls_futures_concurrently() {
    common::init_tracing();

    let rt = RuntimeBuilder::new().build();
    let counter = Arc::new(AtomicUsize::new(0));
    let gate = ManualResetEvent::new(false);

    let c1 = counter.clone();
    let c2 = counter.clone();
    let waiter = gate.clone();
    let opener = gate.clone();

    rt.block_on(async move {
        // The first future only finishes once the second has run.
        join!(
            async move {
                waiter.wait().await.unwrap();
                c1.fetch_add(1, Ordering::SeqCst);
            },
            async move {
                c2.fetch_add(10, Ordering::SeqCst);
                opener.set();
            }
        );
    });

    assert_eq!(counter.load(Ordering::SeqCst), 11);
}

#[concord::test]
async fn test_attribute_macro_runs_async_body() {
    common::init_tracing();

    task::delay(Duration::from_millis(5)).await;
    assert_eq!(task::spawn(async { 7 }).await, 7);
}
