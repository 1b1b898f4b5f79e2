//! 任务调度
//!
//! 守卫模块的轮询（开发者工具检测、控制台清理、行为观察）通过 [`Scheduler`] 注册。
//! 返回的 [`TaskHandle`] 在 `cancel()` 或被 drop 时取消任务，
//! 守卫销毁时丢弃句柄即可停止全部轮询。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::ManualClock;

/// 调度任务
pub type TaskFn = Box<dyn FnMut() + Send>;

/// 任务句柄，drop 时取消任务
pub struct TaskHandle {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl TaskHandle {
    pub fn new(id: u64, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 取消任务
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

/// 调度器
pub trait Scheduler: Send + Sync {
    /// 每隔 `period` 执行一次（首次在一个周期之后）
    fn set_interval(&self, period: Duration, task: TaskFn) -> TaskHandle;

    /// 延迟 `delay` 后执行一次
    fn set_timeout(&self, delay: Duration, task: TaskFn) -> TaskHandle;
}

// ============================================================================
// 手动调度器
// ============================================================================

const MIN_PERIOD: Duration = Duration::from_millis(1);

struct ManualTask {
    due: Duration,
    period: Option<Duration>,
    /// 执行期间为 None
    callback: Option<TaskFn>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    tasks: BTreeMap<u64, ManualTask>,
}

/// 虚拟时间调度器
///
/// 只有调用 [`ManualScheduler::advance`] 时才会执行到期任务。
/// 绑定 [`ManualClock`] 后，时钟随虚拟时间同步推进。
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
    clock: Option<ManualClock>,
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("elapsed", &self.elapsed())
            .field("pending", &self.pending_tasks())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定时钟
    pub fn with_clock(clock: ManualClock) -> Self {
        Self {
            state: Arc::default(),
            clock: Some(clock),
        }
    }

    /// 已经过的虚拟时间
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    /// 尚未取消的任务数
    pub fn pending_tasks(&self) -> usize {
        self.lock().tasks.len()
    }

    /// 推进虚拟时间并执行到期任务
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by;

        loop {
            let next = {
                let mut state = self.lock();
                let due = state
                    .tasks
                    .iter()
                    .filter(|(_, t)| t.callback.is_some() && t.due <= target)
                    .min_by_key(|(id, t)| (t.due, **id))
                    .map(|(id, t)| (*id, t.due));

                match due {
                    Some((id, due)) => {
                        let step = due.saturating_sub(state.now);
                        state.now = state.now.max(due);
                        let callback = state.tasks.get_mut(&id).and_then(|t| t.callback.take());
                        callback.map(|cb| (id, step, cb))
                    }
                    None => None,
                }
            };

            let Some((id, step, mut callback)) = next else {
                break;
            };
            self.tick_clock(step);

            callback();

            let mut state = self.lock();
            let remove = match state.tasks.get_mut(&id) {
                Some(task) => match task.period {
                    Some(period) => {
                        task.due += period;
                        task.callback = Some(callback);
                        false
                    }
                    None => true,
                },
                // 执行期间被取消
                None => false,
            };
            if remove {
                state.tasks.remove(&id);
            }
        }

        let step = {
            let mut state = self.lock();
            let step = target.saturating_sub(state.now);
            state.now = target;
            step
        };
        self.tick_clock(step);
    }

    fn schedule(&self, delay: Duration, period: Option<Duration>, task: TaskFn) -> TaskHandle {
        let id = {
            let mut state = self.lock();
            state.next_id += 1;
            let id = state.next_id;
            let due = state.now + delay;
            state.tasks.insert(
                id,
                ManualTask {
                    due,
                    period,
                    callback: Some(task),
                },
            );
            id
        };

        let state = Arc::clone(&self.state);
        TaskHandle::new(id, move || {
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .tasks
                .remove(&id);
        })
    }

    fn tick_clock(&self, step: Duration) {
        if let Some(clock) = &self.clock
            && !step.is_zero()
        {
            clock.advance(step);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn set_interval(&self, period: Duration, task: TaskFn) -> TaskHandle {
        let period = period.max(MIN_PERIOD);
        self.schedule(period, Some(period), task)
    }

    fn set_timeout(&self, delay: Duration, task: TaskFn) -> TaskHandle {
        self.schedule(delay, None, task)
    }
}

// ============================================================================
// tokio 调度器
// ============================================================================

#[cfg(feature = "tokio-scheduler")]
pub use self::tokio_impl::TokioScheduler;

#[cfg(feature = "tokio-scheduler")]
mod tokio_impl {
    use super::{MIN_PERIOD, Scheduler, TaskFn, TaskHandle};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::runtime::Handle;

    use crate::error::{Error, Result};

    /// 基于 tokio 运行时的调度器
    #[derive(Debug)]
    pub struct TokioScheduler {
        handle: Handle,
        next_id: AtomicU64,
    }

    impl TokioScheduler {
        /// 使用当前运行时创建
        pub fn current() -> Result<Self> {
            let handle = Handle::try_current()
                .map_err(|e| Error::internal(format!("no tokio runtime: {}", e)))?;
            Ok(Self::new(handle))
        }

        pub fn new(handle: Handle) -> Self {
            Self {
                handle,
                next_id: AtomicU64::new(1),
            }
        }

        fn next_id(&self) -> u64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }
    }

    impl Scheduler for TokioScheduler {
        fn set_interval(&self, period: Duration, mut task: TaskFn) -> TaskHandle {
            let period = period.max(MIN_PERIOD);
            let join = self.handle.spawn(async move {
                let mut interval = tokio::time::interval(period);
                // 第一次 tick 立即完成
                interval.tick().await;
                loop {
                    interval.tick().await;
                    task();
                }
            });
            TaskHandle::new(self.next_id(), move || join.abort())
        }

        fn set_timeout(&self, delay: Duration, mut task: TaskFn) -> TaskHandle {
            let join = self.handle.spawn(async move {
                tokio::time::sleep(delay).await;
                task();
            });
            TaskHandle::new(self.next_id(), move || join.abort())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> TaskFn {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_interval_runs_each_period() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.set_interval(Duration::from_millis(100), counting(&counter));

        scheduler.advance(Duration::from_millis(99));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        scheduler.advance(Duration::from_millis(450));
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_timeout_runs_once() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.set_timeout(Duration::from_secs(10), counting(&counter));

        scheduler.advance(Duration::from_secs(30));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn test_drop_cancels_task() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.set_interval(Duration::from_millis(50), counting(&counter));

        scheduler.advance(Duration::from_millis(100));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        drop(handle);
        assert_eq!(scheduler.pending_tasks(), 0);
        scheduler.advance(Duration::from_millis(500));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_explicit_cancel() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.set_timeout(Duration::from_millis(10), counting(&counter));

        handle.cancel();
        scheduler.advance(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clock_follows_virtual_time() {
        let clock = ManualClock::default();
        let start = clock.now();
        let scheduler = ManualScheduler::with_clock(clock.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let c = clock.clone();
        let _handle = scheduler.set_interval(
            Duration::from_millis(40),
            Box::new(move || s.lock().unwrap().push(c.now())),
        );

        scheduler.advance(Duration::from_millis(100));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!((seen[0] - start).num_milliseconds(), 40);
        assert_eq!((seen[1] - start).num_milliseconds(), 80);
        assert_eq!((clock.now() - start).num_milliseconds(), 100);
    }

    #[cfg(feature = "tokio-scheduler")]
    #[tokio::test(start_paused = true)]
    async fn test_tokio_interval_and_abort() {
        let scheduler = TokioScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.set_interval(Duration::from_millis(100), counting(&counter));

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
