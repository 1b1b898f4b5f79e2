//! 集成测试：tokio 调度器
//!
//! 使用暂停的 tokio 时钟验证周期任务与延迟任务，以及句柄释放后的取消。

#![cfg(feature = "tokio-scheduler")]

use shieldrs::host::{Scheduler, TokioScheduler};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn counter() -> (Arc<AtomicUsize>, Box<dyn FnMut() + Send>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    (
        count,
        Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

#[tokio::test(start_paused = true)]
async fn test_interval_until_cancelled() {
    let scheduler = TokioScheduler::current().unwrap();
    let (count, task) = counter();

    let handle = scheduler.set_interval(Duration::from_millis(100), task);
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);

    handle.cancel();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_runs_once() {
    let scheduler = TokioScheduler::current().unwrap();
    let (count, task) = counter();

    let _handle = scheduler.set_timeout(Duration::from_secs(10), task);
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_cancels() {
    let scheduler = TokioScheduler::current().unwrap();
    let (count, task) = counter();

    drop(scheduler.set_timeout(Duration::from_millis(50), task));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}
