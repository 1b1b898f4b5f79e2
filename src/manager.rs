//! 防护管理器
//!
//! [`ShieldManager`] 持有全部守卫和共享服务，负责按固定顺序挂载、按相反顺序卸载。
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::config::ShieldConfig;
//! use shieldrs::host::{Capability, MemoryHost};
//! use shieldrs::manager::ShieldManager;
//!
//! let host = MemoryHost::new();
//! let manager = ShieldManager::new(host.env(), Some(ShieldConfig::relaxed())).unwrap();
//!
//! let active = manager.mount();
//! assert_eq!(active, manager.status().len());
//! assert!(manager.is_mounted());
//!
//! // relaxed 预设不替换任何宿主能力
//! assert!(!host.env().is_intercepted(Capability::Fetch));
//!
//! manager.unmount();
//! assert!(!manager.is_mounted());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ShieldConfig;
use crate::error::Result;
use crate::guards::{
    BotGuard, BruteForceGuard, ClipboardGuard, ConsoleGuard, CryptoGuard, CsrfGuard,
    DevtoolsGuard, DomQueryGuard, ExceptionGuard, FileAccessGuard, Guard, GuardContext,
    GuardState, GuardStatus, InjectionGuard, InputGuard, NavigationGuard, NetworkGuard,
    PasswordPolicyGuard, PerformanceGuard, SourceViewGuard, StorageGuard, TimingGuard,
};
use crate::host::Environment;
use crate::lockdown::Lockdown;
use crate::logger::SecurityLogger;

/// 内置守卫，按挂载顺序排列
pub fn default_guards() -> Vec<Box<dyn Guard>> {
    vec![
        Box::new(TimingGuard::new()),
        Box::new(DevtoolsGuard::new()),
        Box::new(ConsoleGuard::new()),
        Box::new(NetworkGuard::new()),
        Box::new(StorageGuard::new()),
        Box::new(DomQueryGuard::new()),
        Box::new(ClipboardGuard::new()),
        Box::new(InputGuard::new()),
        Box::new(PasswordPolicyGuard::new()),
        Box::new(BruteForceGuard::new()),
        Box::new(CsrfGuard::new()),
        Box::new(BotGuard::new()),
        Box::new(InjectionGuard::new()),
        Box::new(SourceViewGuard::new()),
        Box::new(NavigationGuard::new()),
        Box::new(ExceptionGuard::new()),
        Box::new(PerformanceGuard::new()),
        Box::new(CryptoGuard::new()),
        Box::new(FileAccessGuard::new()),
    ]
}

/// 防护管理器
pub struct ShieldManager {
    ctx: GuardContext,
    guards: Vec<Box<dyn Guard>>,
    mounted: AtomicBool,
}

impl fmt::Debug for ShieldManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShieldManager")
            .field("guards", &self.guards.len())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

impl ShieldManager {
    /// 使用内置守卫创建管理器，`config` 为 `None` 时使用默认配置
    pub fn new(env: Arc<Environment>, config: Option<ShieldConfig>) -> Result<Self> {
        Self::builder(env).config(config.unwrap_or_default()).build()
    }

    pub fn builder(env: Arc<Environment>) -> ShieldManagerBuilder {
        ShieldManagerBuilder {
            env,
            config: ShieldConfig::default(),
            guards: None,
        }
    }

    /// 挂载全部守卫，返回处于 `Active` 的守卫数量
    ///
    /// 只有第一次调用生效。单个守卫初始化失败只记录错误，其余守卫继续挂载。
    pub fn mount(&self) -> usize {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return self.active_count();
        }

        let logger = self.ctx.logger();
        logger.info(format!("Mounting {} guards", self.guards.len()));

        for guard in &self.guards {
            if let Err(e) = guard.initialize(&self.ctx) {
                logger.error(format!("{} failed to initialize: {}", guard.name(), e));
            }
        }

        let active = self.active_count();
        logger.info(format!("Shield mounted with {} active guards", active));
        active
    }

    /// 按相反顺序销毁全部守卫
    pub fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }

        for guard in self.guards.iter().rev() {
            guard.destroy();
        }

        let partial: Vec<&'static str> = self
            .guards
            .iter()
            .filter(|g| g.state() == GuardState::Destroyed { partial: true })
            .map(|g| g.name())
            .collect();

        let logger = self.ctx.logger();
        if !partial.is_empty() {
            logger.warn(format!(
                "Guards left permanent interceptions in place: {}",
                partial.join(", ")
            ));
        }
        logger.info("Shield unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// 各守卫的状态
    pub fn status(&self) -> Vec<GuardStatus> {
        self.guards.iter().map(|g| g.status()).collect()
    }

    /// 共享服务
    pub fn context(&self) -> &GuardContext {
        &self.ctx
    }

    pub fn logger(&self) -> &SecurityLogger {
        self.ctx.logger()
    }

    pub fn lockdown(&self) -> &Arc<Lockdown> {
        self.ctx.lockdown()
    }

    fn active_count(&self) -> usize {
        self.guards
            .iter()
            .filter(|g| g.state() == GuardState::Active)
            .count()
    }
}

/// [`ShieldManager`] 构建器
///
/// 嵌入方可以用 [`with_guard`](Self::with_guard) 只挂载自己需要的守卫。
pub struct ShieldManagerBuilder {
    env: Arc<Environment>,
    config: ShieldConfig,
    guards: Option<Vec<Box<dyn Guard>>>,
}

impl ShieldManagerBuilder {
    pub fn config(mut self, config: ShieldConfig) -> Self {
        self.config = config;
        self
    }

    /// 添加守卫；一旦调用，内置守卫列表不再使用
    pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.get_or_insert_with(Vec::new).push(Box::new(guard));
        self
    }

    /// 校验配置并构建共享服务
    pub fn build(self) -> Result<ShieldManager> {
        let ctx = GuardContext::new(self.env, self.config)?;
        Ok(ShieldManager {
            ctx,
            guards: self.guards.unwrap_or_else(default_guards),
            mounted: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::host::{Capability, MemoryHost};
    use crate::logger::LogLevel;

    #[test]
    fn test_mount_default_guards() {
        let host = MemoryHost::new();
        let manager = ShieldManager::new(host.env(), None).unwrap();

        let active = manager.mount();
        assert_eq!(active, 19);
        assert!(manager.status().iter().all(|s| s.state == GuardState::Active));
        assert_eq!(host.env().intercepted().len(), Capability::ALL.len());
        assert!(!manager.lockdown().is_triggered());
    }

    #[test]
    fn test_mount_is_idempotent() {
        let host = MemoryHost::new();
        let manager = ShieldManager::new(host.env(), None).unwrap();

        manager.mount();
        let logged = manager.logger().len();
        manager.mount();

        assert_eq!(manager.logger().len(), logged);
        assert_eq!(manager.logger().count_matching("Mounting"), 1);
    }

    #[test]
    fn test_unmount_reports_partial_guards() {
        let host = MemoryHost::new();
        let manager = ShieldManager::new(host.env(), None).unwrap();
        manager.mount();
        manager.unmount();

        let partial: Vec<&str> = manager
            .status()
            .into_iter()
            .filter(|s| s.state == GuardState::Destroyed { partial: true })
            .map(|s| s.name)
            .collect();
        assert_eq!(
            partial,
            vec!["StorageGuard", "ClipboardGuard", "NavigationGuard", "FileAccessGuard"]
        );
        assert_eq!(
            manager
                .logger()
                .count_matching("permanent interceptions in place: StorageGuard"),
            1
        );
        assert!(!host.env().is_intercepted(Capability::Fetch));
    }

    #[test]
    fn test_frozen_capability_degrades_gracefully() {
        let host = MemoryHost::new();
        host.env().freeze(Capability::Console);
        let manager = ShieldManager::new(host.env(), None).unwrap();

        assert_eq!(manager.mount(), 19);
        assert!(!host.env().is_intercepted(Capability::Console));
        assert_eq!(manager.logger().entries_by_level(LogLevel::Error).len(), 0);
        assert_eq!(manager.logger().count_matching("skipped interception"), 1);
    }

    #[test]
    fn test_builder_with_custom_guards() {
        let host = MemoryHost::new();
        let manager = ShieldManager::builder(host.env())
            .config(ShieldConfig::default())
            .with_guard(StorageGuard::new())
            .with_guard(BruteForceGuard::new())
            .build()
            .unwrap();

        assert_eq!(manager.mount(), 2);
        assert_eq!(manager.status()[0].name, "StorageGuard");
        assert!(!host.env().is_intercepted(Capability::Fetch));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let host = MemoryHost::new();
        let config = ShieldConfig::default().with_log_capacity(0);
        assert!(matches!(
            ShieldManager::new(host.env(), Some(config)),
            Err(Error::Config(_))
        ));
    }
}
