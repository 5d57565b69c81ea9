mod common;

use concord::TaskScheduler;
use concord::task::delay;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn update(n: &Arc<AtomicU64>, f: impl Fn(u64) -> u64 + Send + 'static) -> impl FnOnce() + Send + 'static {
    let n = n.clone();
    move || {
        let value = n.load(Ordering::SeqCst);
        n.store(f(value), Ordering::SeqCst);
    }
}

#[concord::test]
async fn test_yield_runs_lower_priorities_first() {
    common::init_tracing();

    let scheduler = TaskScheduler::global();
    let n = Arc::new(AtomicU64::new(100));

    scheduler.schedule(update(&n, |n| n * 2), 1);
    scheduler.schedule(update(&n, |n| n + 1), 0);
    scheduler.yield_now(2).await;
    assert_eq!(n.load(Ordering::SeqCst), 202);

    scheduler.schedule(update(&n, |n| n * n), 1);
    scheduler.yield_now(2).await;
    assert_eq!(n.load(Ordering::SeqCst), 202 * 202);
}

#[concord::test]
async fn test_yield_resumes_before_higher_priority_values() {
    common::init_tracing();

    let scheduler = TaskScheduler::global();
    let n = Arc::new(AtomicU64::new(100));

    scheduler.schedule(update(&n, |n| n * 2), 2);
    scheduler.schedule(update(&n, |n| n + 1), 0);
    scheduler.yield_now(1).await;

    // The doubling at priority 2 has not run yet.
    let value = n.load(Ordering::SeqCst);
    assert_eq!(value, 101);
    n.store(value * value, Ordering::SeqCst);

    delay(Duration::from_millis(100)).await;
    assert_eq!(n.load(Ordering::SeqCst), 101 * 101 * 2);
}

#[concord::test]
async fn test_yield_runs_same_priority_work_queued_before_it() {
    common::init_tracing();

    let scheduler = TaskScheduler::global();
    let n = Arc::new(AtomicU64::new(5));

    scheduler.schedule(update(&n, |n| n * 3), 3);
    scheduler.schedule(update(&n, |n| n + 1), 3);
    scheduler.yield_now(3).await;

    assert_eq!(n.load(Ordering::SeqCst), 16);
}

#[concord::test]
async fn test_many_consecutive_yields() {
    common::init_tracing();

    let mut count = 0;
    for _ in 0..100 {
        concord::yield_now().await;
        count += 1;
    }

    assert_eq!(count, 100);
}

#[concord::test]
async fn test_host_event_queued_before_yield_runs_first() {
    common::init_tracing();

    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();

    concord::process_host().defer(Box::new(move || flag.store(true, Ordering::SeqCst)));
    concord::yield_now().await;

    assert!(fired.load(Ordering::SeqCst));
}

#[concord::test]
async fn test_run_is_fire_and_forget() {
    common::init_tracing();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    concord::task::run(move || flag.store(true, Ordering::SeqCst));
    assert!(!ran.load(Ordering::SeqCst));

    concord::yield_now().await;
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_schedule_from_a_foreign_thread_runs_on_the_host() {
    common::init_tracing();

    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        TaskScheduler::global().schedule(
            move || {
                let name = thread::current().name().map(str::to_string);
                tx.send(name).unwrap();
            },
            0,
        );
    })
    .join()
    .unwrap();

    let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(name.as_deref(), Some("concord-event-loop"));
}
