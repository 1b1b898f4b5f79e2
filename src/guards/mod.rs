//! 守卫模块
//!
//! 每个守卫负责一个能力域：安装拦截、注册监听器或轮询任务，
//! 在检测到违规时调用共享的 [`Lockdown`]。
//!
//! 所有守卫遵循相同的生命周期：
//!
//! - `initialize`：已处于 `Active` 时直接返回；拦截安装失败只记录警告并跳过
//! - `destroy`：不处于 `Active` 时直接返回；取消任务、移除监听器、恢复可恢复的拦截
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::config::ShieldConfig;
//! use shieldrs::guards::{Guard, GuardContext, GuardState, StorageGuard};
//! use shieldrs::host::{Capability, MemoryHost};
//!
//! let host = MemoryHost::new();
//! let ctx = GuardContext::new(host.env(), ShieldConfig::default()).unwrap();
//!
//! let guard = StorageGuard::new();
//! guard.initialize(&ctx).unwrap();
//! assert_eq!(guard.state(), GuardState::Active);
//! assert!(host.env().is_sealed(Capability::LocalStorage));
//!
//! guard.destroy();
//! assert_eq!(guard.state(), GuardState::Destroyed { partial: true });
//! ```

mod bot;
mod brute_force;
mod clipboard;
mod console;
mod crypto;
mod csrf;
mod devtools;
mod dom;
mod exception;
mod file_access;
mod injection;
mod input;
mod lifecycle;
mod navigation;
mod network;
mod password;
mod performance;
mod source_view;
mod storage;
mod timing;
mod tripwire;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::ShieldConfig;
use crate::error::Result;
use crate::host::Environment;
use crate::lockdown::Lockdown;
use crate::logger::SecurityLogger;
use crate::security::{
    AccountLockoutConfig, CsrfConfig, CsrfProtection, LoginAttemptTracker, RateLimitConfig,
    RateLimiter,
};

pub use bot::{BotGuard, automation_indicators, blocked_user_agent};
pub use brute_force::{BruteForceGuard, IDENTITY_FIELDS};
pub use clipboard::ClipboardGuard;
pub use console::ConsoleGuard;
pub use crypto::CryptoGuard;
pub use csrf::{CSRF_FIELD, CsrfGuard};
pub use devtools::DevtoolsGuard;
pub use dom::DomQueryGuard;
pub use exception::ExceptionGuard;
pub use file_access::FileAccessGuard;
pub use injection::{InjectionDetector, InjectionGuard};
pub use input::{ADMIN_ACTION_ATTRIBUTE, InputGuard};
pub use lifecycle::{GuardCore, Installation};
pub use navigation::NavigationGuard;
pub use network::{NetworkGuard, RateLimitedNetwork};
pub use password::PasswordPolicyGuard;
pub use performance::PerformanceGuard;
pub use source_view::SourceViewGuard;
pub use storage::StorageGuard;
pub use timing::TimingGuard;
pub use tripwire::Tripwire;

/// 守卫生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GuardState {
    #[default]
    Uninitialized,
    Active,
    /// `partial` 表示有永久拦截无法恢复
    Destroyed { partial: bool },
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardState::Uninitialized => write!(f, "uninitialized"),
            GuardState::Active => write!(f, "active"),
            GuardState::Destroyed { partial: false } => write!(f, "destroyed"),
            GuardState::Destroyed { partial: true } => write!(f, "destroyed (partial)"),
        }
    }
}

/// 守卫状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardStatus {
    pub name: &'static str,
    pub state: GuardState,
}

/// 守卫模块
pub trait Guard: Send + Sync {
    /// 守卫名称
    fn name(&self) -> &'static str;

    /// 安装拦截、监听器和轮询任务
    fn initialize(&self, ctx: &GuardContext) -> Result<()>;

    /// 尽力撤销安装的内容
    fn destroy(&self);

    fn state(&self) -> GuardState;

    fn status(&self) -> GuardStatus {
        GuardStatus {
            name: self.name(),
            state: self.state(),
        }
    }
}

/// 守卫共享的服务
///
/// 在挂载时构建一次，克隆出的句柄共享同一组服务。
#[derive(Clone)]
pub struct GuardContext {
    env: Arc<Environment>,
    config: Arc<ShieldConfig>,
    logger: SecurityLogger,
    lockdown: Arc<Lockdown>,
    rate_limiter: Arc<RateLimiter>,
    login_tracker: Arc<LoginAttemptTracker>,
    csrf: Arc<CsrfProtection>,
}

impl fmt::Debug for GuardContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardContext")
            .field("lockdown", &self.lockdown)
            .field("logger", &self.logger)
            .finish()
    }
}

impl GuardContext {
    /// 校验配置并构建全部共享服务
    pub fn new(env: Arc<Environment>, config: ShieldConfig) -> Result<Self> {
        config.validate()?;

        let clock = Arc::clone(env.clock());
        let logger = SecurityLogger::with_clock(config.log_capacity, Arc::clone(&clock));
        let lockdown = Arc::new(Lockdown::new(&env, logger.clone()));
        let rate_limiter = Arc::new(RateLimiter::with_clock(
            RateLimitConfig::from_config(&config),
            Arc::clone(&clock),
        ));
        let login_tracker = Arc::new(LoginAttemptTracker::with_clock(
            AccountLockoutConfig::from_config(&config),
            Arc::clone(&clock),
        )?);
        let csrf = Arc::new(CsrfProtection::with_clock(
            CsrfConfig::from_config(&config)?,
            clock,
        ));

        Ok(Self {
            env,
            config: Arc::new(config),
            logger,
            lockdown,
            rate_limiter,
            login_tracker,
            csrf,
        })
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    pub fn logger(&self) -> &SecurityLogger {
        &self.logger
    }

    pub fn lockdown(&self) -> &Arc<Lockdown> {
        &self.lockdown
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn login_tracker(&self) -> &Arc<LoginAttemptTracker> {
        &self.login_tracker
    }

    pub fn csrf(&self) -> &Arc<CsrfProtection> {
        &self.csrf
    }

    /// 记录违规并触发锁定
    pub fn violation(&self, guard: &str, detail: impl fmt::Display) {
        let message = format!("{}: {}", guard, detail);
        self.logger.warn(message.clone());
        self.lockdown.trigger(&message);
    }
}
