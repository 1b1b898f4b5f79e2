//! 账户安全模块
//!
//! 按身份键（例如规范化后的邮箱）追踪登录尝试并执行锁定：
//!
//! - *Unlocked*：尝试窗口内的次数少于上限
//! - *Throttled*：窗口内尝试次数已达上限，下一次提交将触发锁定
//! - *Locked*：记录了锁定开始时间，持续 `lockout_duration`
//!
//! 锁定只会因时间到期或显式 [`LoginAttemptTracker::unlock`] 解除。
//! 到期判断使用严格大于：`now - locked_at > lockout_duration`。
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::security::account::{AccountLockoutConfig, LoginAttemptTracker, LoginCheckResult};
//!
//! let tracker = LoginAttemptTracker::new(AccountLockoutConfig::default()).unwrap();
//! for _ in 0..5 {
//!     assert!(tracker.check_and_record("a@b.com").is_allowed());
//! }
//! assert!(matches!(
//!     tracker.check_and_record("a@b.com"),
//!     LoginCheckResult::LockedOut { .. }
//! ));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::clock::{SharedClock, SystemClock, add_saturating, elapsed_between, to_time_delta};
use crate::config::ShieldConfig;
use crate::error::{Error, Result};

/// 账户锁定配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLockoutConfig {
    /// 触发锁定前允许的最大尝试次数
    pub max_attempts: u32,

    /// 锁定持续时间
    pub lockout_duration: Duration,

    /// 尝试计数的回溯窗口
    pub attempt_window: Duration,
}

impl Default for AccountLockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
            attempt_window: Duration::from_secs(5 * 60),
        }
    }
}

impl AccountLockoutConfig {
    /// 创建严格的安全配置
    pub fn strict() -> Self {
        Self {
            max_attempts: 3,
            lockout_duration: Duration::from_secs(30 * 60),
            attempt_window: Duration::from_secs(5 * 60),
        }
    }

    /// 创建宽松的配置（适用于开发环境）
    pub fn relaxed() -> Self {
        Self {
            max_attempts: 10,
            lockout_duration: Duration::from_secs(5 * 60),
            attempt_window: Duration::from_secs(5 * 60),
        }
    }

    /// 从全局配置读取
    pub fn from_config(config: &ShieldConfig) -> Self {
        Self {
            max_attempts: config.max_login_attempts,
            lockout_duration: config.lockout_duration,
            attempt_window: config.login_attempt_window,
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::validation("max_attempts must be greater than 0"));
        }
        if self.lockout_duration.is_zero() {
            return Err(Error::validation("lockout_duration must be greater than 0"));
        }
        if self.attempt_window.is_zero() {
            return Err(Error::validation("attempt_window must be greater than 0"));
        }
        Ok(())
    }
}

/// 锁定原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockReason {
    /// 登录尝试次数过多
    TooManyAttempts,
    /// 管理员手动锁定
    AdminAction,
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockReason::TooManyAttempts => write!(f, "too many login attempts"),
            LockReason::AdminAction => write!(f, "locked by administrator"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LockRecord {
    locked_at: DateTime<Utc>,
    reason: LockReason,
}

/// 一次提交的检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginCheckResult {
    /// 允许提交，尝试已记录
    Allowed {
        /// 进入锁定前还剩余的尝试次数
        attempts_remaining: u32,
    },

    /// 已处于锁定状态
    Locked {
        reason: LockReason,
        /// 剩余锁定时间
        remaining: Duration,
    },

    /// 本次提交导致进入锁定
    LockedOut {
        /// 锁定结束时间
        until: DateTime<Utc>,
    },
}

impl LoginCheckResult {
    /// 是否允许提交
    pub fn is_allowed(&self) -> bool {
        matches!(self, LoginCheckResult::Allowed { .. })
    }
}

/// 身份的当前状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked {
        attempts: u32,
    },
    /// 窗口内尝试次数已达上限
    Throttled {
        attempts: u32,
    },
    Locked {
        reason: LockReason,
        until: DateTime<Utc>,
    },
}

/// 追踪器统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackerStats {
    /// 有尝试记录的身份数
    pub tracked_identities: usize,
    /// 当前锁定的身份数
    pub locked_identities: usize,
    /// 窗口内的尝试总数
    pub total_attempts: usize,
}

#[derive(Debug, Default)]
struct TrackerState {
    attempts: HashMap<String, Vec<DateTime<Utc>>>,
    locks: HashMap<String, LockRecord>,
}

/// 登录尝试追踪器
///
/// 内部可变，多个守卫通过 `Arc` 共享同一个实例。
pub struct LoginAttemptTracker {
    config: AccountLockoutConfig,
    state: Arc<RwLock<TrackerState>>,
    clock: SharedClock,
}

impl fmt::Debug for LoginAttemptTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAttemptTracker")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl LoginAttemptTracker {
    /// 创建新的追踪器
    pub fn new(config: AccountLockoutConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 指定时钟创建
    pub fn with_clock(config: AccountLockoutConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: Arc::new(RwLock::new(TrackerState::default())),
            clock,
        })
    }

    /// 使用默认配置创建追踪器
    pub fn with_default_config() -> Self {
        Self {
            config: AccountLockoutConfig::default(),
            state: Arc::new(RwLock::new(TrackerState::default())),
            clock: Arc::new(SystemClock),
        }
    }

    /// 获取配置引用
    pub fn config(&self) -> &AccountLockoutConfig {
        &self.config
    }

    /// 检查一次提交并记录
    pub fn check_and_record(&self, identity: &str) -> LoginCheckResult {
        let now = self.clock.now();
        let mut guard = self.write();
        let state = &mut *guard;
        self.prune(state, now);

        // prune 之后留下的锁定都未到期
        if let Some(lock) = state.locks.get(identity) {
            let elapsed = elapsed_between(lock.locked_at, now);
            return LoginCheckResult::Locked {
                reason: lock.reason,
                remaining: self.config.lockout_duration.saturating_sub(elapsed),
            };
        }

        let attempts = state.attempts.entry(identity.to_string()).or_default();

        if attempts.len() as u32 >= self.config.max_attempts {
            state.locks.insert(
                identity.to_string(),
                LockRecord {
                    locked_at: now,
                    reason: LockReason::TooManyAttempts,
                },
            );
            return LoginCheckResult::LockedOut {
                until: add_saturating(now, self.config.lockout_duration),
            };
        }

        attempts.push(now);
        LoginCheckResult::Allowed {
            attempts_remaining: self.config.max_attempts - attempts.len() as u32,
        }
    }

    /// 查询身份状态（不记录尝试）
    pub fn status(&self, identity: &str) -> LockStatus {
        let now = self.clock.now();
        let state = self.read();

        if let Some(lock) = state.locks.get(identity)
            && elapsed_between(lock.locked_at, now) <= self.config.lockout_duration
        {
            return LockStatus::Locked {
                reason: lock.reason,
                until: add_saturating(lock.locked_at, self.config.lockout_duration),
            };
        }

        let attempts = self.count_in_window(&state, identity, now);
        if attempts >= self.config.max_attempts {
            LockStatus::Throttled { attempts }
        } else {
            LockStatus::Unlocked { attempts }
        }
    }

    /// 是否处于锁定状态
    pub fn is_locked(&self, identity: &str) -> bool {
        matches!(self.status(identity), LockStatus::Locked { .. })
    }

    /// 窗口内的尝试次数
    pub fn attempt_count(&self, identity: &str) -> u32 {
        let now = self.clock.now();
        let state = self.read();
        self.count_in_window(&state, identity, now)
    }

    /// 手动锁定
    pub fn lock(&self, identity: &str, reason: LockReason) {
        let locked_at = self.clock.now();
        self.write()
            .locks
            .insert(identity.to_string(), LockRecord { locked_at, reason });
    }

    /// 手动解锁并清除尝试记录
    pub fn unlock(&self, identity: &str) {
        let mut state = self.write();
        state.locks.remove(identity);
        state.attempts.remove(identity);
    }

    /// 清理过期的锁定和尝试记录
    pub fn cleanup_expired(&self) {
        let now = self.clock.now();
        self.prune(&mut self.write(), now);
    }

    /// 统计信息
    pub fn stats(&self) -> TrackerStats {
        let now = self.clock.now();
        let window = to_time_delta(self.config.attempt_window);
        let state = self.read();

        let total_attempts = state
            .attempts
            .values()
            .map(|ts| {
                ts.iter()
                    .filter(|t| now.signed_duration_since(**t) <= window)
                    .count()
            })
            .sum();

        TrackerStats {
            tracked_identities: state.attempts.len(),
            locked_identities: state
                .locks
                .values()
                .filter(|l| elapsed_between(l.locked_at, now) <= self.config.lockout_duration)
                .count(),
            total_attempts,
        }
    }

    /// 移除到期的锁定和窗口外的尝试
    ///
    /// 锁定到期时该身份的尝试记录一起清除。
    fn prune(&self, state: &mut TrackerState, now: DateTime<Utc>) {
        let window = to_time_delta(self.config.attempt_window);
        let lockout = self.config.lockout_duration;
        let TrackerState { attempts, locks } = state;

        locks.retain(|identity, lock| {
            let active = elapsed_between(lock.locked_at, now) <= lockout;
            if !active {
                attempts.remove(identity);
            }
            active
        });
        attempts.retain(|_, ts| {
            ts.retain(|t| now.signed_duration_since(*t) <= window);
            !ts.is_empty()
        });
    }

    fn count_in_window(&self, state: &TrackerState, identity: &str, now: DateTime<Utc>) -> u32 {
        let window = to_time_delta(self.config.attempt_window);
        state
            .attempts
            .get(identity)
            .map(|ts| {
                ts.iter()
                    .filter(|t| now.signed_duration_since(**t) <= window)
                    .count() as u32
            })
            .unwrap_or(0)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TrackerState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TrackerState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
