//! 时钟抽象
//!
//! 锁定、速率限制和轮询逻辑都通过 [`Clock`] 读取当前时间，
//! 测试中使用 [`ManualClock`] 手动推进时间。

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 时间来源
pub trait Clock: Send + Sync + fmt::Debug {
    /// 当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// 共享时钟
pub type SharedClock = Arc<dyn Clock>;

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟
///
/// 克隆出的实例共享同一个时间点。
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl ManualClock {
    /// 从指定时间点开始
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// 向前推进时间
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = add_saturating(*now, by);
    }

    /// 直接设置当前时间
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 计算 `now - earlier`，负值视为零
pub fn elapsed_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// 将标准库 Duration 转换为 chrono 时间差（溢出时取最大值）
pub fn to_time_delta(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// `at + duration`，超出可表示范围时停在最大时间点
pub fn add_saturating(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    at.checked_add_signed(to_time_delta(duration)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
