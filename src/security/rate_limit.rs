//! 速率限制模块
//!
//! 基于滑动窗口的请求计数。每次检查前先裁剪该键下超出窗口的时间戳，
//! 窗口内计数小于上限时放行并记录本次时间戳。
//!
//! 时间边界是闭区间：`now - ts <= window` 的记录仍计入窗口。
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::security::rate_limit::{RateLimiter, RateLimitConfig};
//! use std::time::Duration;
//!
//! // 每分钟最多 5 次请求
//! let config = RateLimitConfig::new()
//!     .with_max_requests(5)
//!     .with_window(Duration::from_secs(60));
//! let limiter = RateLimiter::new(config);
//!
//! let key = "https://api.example.com";
//! let result = limiter.check(key);
//! assert!(result.is_ok());
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::clock::{SharedClock, SystemClock, elapsed_between, to_time_delta};
use crate::config::ShieldConfig;
use crate::error::{Error, Result};

/// 速率限制配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// 时间窗口内允许的最大请求数
    pub max_requests: u32,
    /// 时间窗口大小
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置最大请求数
    pub fn with_max_requests(mut self, max: u32) -> Self {
        self.max_requests = max;
        self
    }

    /// 设置时间窗口
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// 从全局配置读取
    pub fn from_config(config: &ShieldConfig) -> Self {
        Self {
            max_requests: config.rate_limit_max_requests,
            window: config.rate_limit_window,
        }
    }
}

/// 速率限制信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// 剩余请求次数
    pub remaining: u32,
    /// 总限制次数
    pub limit: u32,
    /// 窗口内最早一条记录过期所需时间
    pub reset_after: Duration,
}

/// 滑动窗口速率限制器
///
/// 内部使用 `RwLock` 保存每个键的时间戳列表，可以在多个守卫间共享。
pub struct RateLimiter {
    config: RateLimitConfig,
    records: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    clock: SharedClock,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("keys", &self.key_count())
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiter {
    /// 使用系统时钟创建
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 指定时钟创建
    pub fn with_clock(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            config,
            records: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// 获取配置
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 检查并记录一次请求
    ///
    /// 超出限制时返回 [`Error::RateLimitExceeded`]，被拒绝的请求不会被记录。
    pub fn check(&self, key: &str) -> Result<RateLimitInfo> {
        let now = self.clock.now();
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut records, now);
        let timestamps = records.entry(key.to_string()).or_default();

        let count = timestamps.len() as u32;
        if count >= self.config.max_requests {
            let retry_after = self.reset_after(timestamps, now);
            return Err(Error::rate_limited(retry_after));
        }

        timestamps.push(now);
        let reset_after = self.reset_after(timestamps, now);
        Ok(RateLimitInfo {
            remaining: self.config.max_requests - count - 1,
            limit: self.config.max_requests,
            reset_after,
        })
    }

    /// 检查并记录，只返回是否放行
    pub fn admit(&self, key: &str) -> bool {
        self.check(key).is_ok()
    }

    /// 查询当前状态（不记录请求）
    pub fn status(&self, key: &str) -> RateLimitInfo {
        let now = self.clock.now();
        let window = to_time_delta(self.config.window);
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());

        let active: Vec<DateTime<Utc>> = records
            .get(key)
            .map(|ts| {
                ts.iter()
                    .filter(|ts| now.signed_duration_since(**ts) <= window)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        let count = active.len() as u32;
        RateLimitInfo {
            remaining: self.config.max_requests.saturating_sub(count),
            limit: self.config.max_requests,
            reset_after: self.reset_after(&active, now),
        }
    }

    /// 重置某个键
    pub fn reset(&self, key: &str) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// 清理所有过期记录，并移除空键
    pub fn cleanup(&self) {
        let now = self.clock.now();
        self.prune(&mut self.records.write().unwrap_or_else(|e| e.into_inner()), now);
    }

    /// 当前跟踪的键数量
    pub fn key_count(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn prune(&self, records: &mut HashMap<String, Vec<DateTime<Utc>>>, now: DateTime<Utc>) {
        let window = to_time_delta(self.config.window);
        records.retain(|_, timestamps| {
            timestamps.retain(|ts| now.signed_duration_since(*ts) <= window);
            !timestamps.is_empty()
        });
    }

    fn reset_after(&self, timestamps: &[DateTime<Utc>], now: DateTime<Utc>) -> Duration {
        timestamps
            .iter()
            .min()
            .map(|oldest| {
                self.config
                    .window
                    .saturating_sub(elapsed_between(*oldest, now))
            })
            .unwrap_or(Duration::ZERO)
    }
}

/// 创建一个闭包形式的限流器
///
/// 返回的闭包持有自己的状态：对同一个键，在 `window` 内最多返回 `max_requests` 次 `true`。
///
/// ```rust
/// use shieldrs::security::rate_limit::create_rate_limiter;
/// use std::time::Duration;
///
/// let mut allow = create_rate_limiter(2, Duration::from_secs(60));
/// assert!(allow("client"));
/// assert!(allow("client"));
/// assert!(!allow("client"));
/// assert!(allow("other"));
/// ```
pub fn create_rate_limiter(max_requests: u32, window: Duration) -> impl FnMut(&str) -> bool {
    create_rate_limiter_with_clock(max_requests, window, Arc::new(SystemClock))
}

/// 指定时钟的闭包限流器
pub fn create_rate_limiter_with_clock(
    max_requests: u32,
    window: Duration,
    clock: SharedClock,
) -> impl FnMut(&str) -> bool {
    let limiter = RateLimiter::with_clock(
        RateLimitConfig::new()
            .with_max_requests(max_requests)
            .with_window(window),
        clock,
    );
    move |key: &str| limiter.admit(key)
}
