//! 守卫生命周期模板
//!
//! [`GuardCore`] 保存守卫的状态、任务句柄、监听器 ID 和拦截凭据，
//! 具体守卫只需要在 [`Installation`] 上声明要安装的内容。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{GuardContext, GuardState};
use crate::error::Result;
use crate::host::{
    EventControl, EventKind, GatewaySlot, HostEvent, InterceptMode, InterceptReceipt, ListenerId,
    Phase, RestoreOutcome, TaskHandle,
};

#[derive(Default)]
struct Installed {
    tasks: Vec<TaskHandle>,
    listeners: Vec<ListenerId>,
    receipts: Vec<InterceptReceipt>,
}

#[derive(Default)]
struct CoreState {
    state: GuardState,
    ctx: Option<GuardContext>,
    installed: Installed,
}

/// 守卫共享的生命周期实现
pub struct GuardCore {
    name: &'static str,
    inner: Mutex<CoreState>,
}

impl std::fmt::Debug for GuardCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardCore")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl GuardCore {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(CoreState::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> GuardState {
        self.lock().state
    }

    /// 执行安装
    ///
    /// 已经处于 `Active` 时不做任何事。安装闭包返回错误时，
    /// 已安装的部分会被撤销，状态保持不变。
    pub fn initialize_with<F>(&self, ctx: &GuardContext, install: F) -> Result<()>
    where
        F: FnOnce(&mut Installation) -> Result<()>,
    {
        if self.state() == GuardState::Active {
            return Ok(());
        }

        let mut installation = Installation {
            guard: self.name,
            ctx: ctx.clone(),
            installed: Installed::default(),
        };

        if let Err(e) = install(&mut installation) {
            teardown(self.name, ctx, installation.installed);
            ctx.logger()
                .error(format!("{}: initialization failed: {}", self.name, e));
            return Err(e);
        }

        let mut inner = self.lock();
        if inner.state == GuardState::Active {
            drop(inner);
            teardown(self.name, ctx, installation.installed);
            return Ok(());
        }
        inner.state = GuardState::Active;
        inner.ctx = Some(ctx.clone());
        inner.installed = installation.installed;
        drop(inner);

        ctx.logger().info(format!("{} initialized", self.name));
        Ok(())
    }

    /// 撤销安装
    pub fn destroy(&self) {
        let (ctx, installed) = {
            let mut inner = self.lock();
            if inner.state != GuardState::Active {
                return;
            }
            let Some(ctx) = inner.ctx.take() else {
                return;
            };
            (ctx, std::mem::take(&mut inner.installed))
        };

        let partial = teardown(self.name, &ctx, installed);
        self.lock().state = GuardState::Destroyed { partial };

        if partial {
            ctx.logger().warn(format!(
                "{} destroyed with permanent interceptions left in place",
                self.name
            ));
        } else {
            ctx.logger().info(format!("{} destroyed", self.name));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CoreState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 返回是否存在无法恢复的拦截
fn teardown(guard: &str, ctx: &GuardContext, installed: Installed) -> bool {
    drop(installed.tasks);

    for id in installed.listeners {
        ctx.env().events().remove_listener(id);
    }

    let mut partial = false;
    for receipt in installed.receipts {
        match ctx.env().restore(receipt.capability) {
            RestoreOutcome::Restored | RestoreOutcome::NotIntercepted => {}
            RestoreOutcome::NotRestorable => {
                partial = true;
                ctx.logger().warn(format!(
                    "{}: {} cannot be restored",
                    guard, receipt.capability
                ));
            }
        }
    }
    partial
}

/// 一次安装过程
pub struct Installation {
    guard: &'static str,
    ctx: GuardContext,
    installed: Installed,
}

impl Installation {
    pub fn ctx(&self) -> &GuardContext {
        &self.ctx
    }

    /// 替换插槽中的实现
    ///
    /// 宿主拒绝时记录警告并返回 false。
    pub fn intercept<T: ?Sized>(
        &mut self,
        slot: &GatewaySlot<T>,
        replacement: Arc<T>,
        mode: InterceptMode,
    ) -> bool {
        match slot.intercept(replacement, mode) {
            Ok(receipt) => {
                self.installed.receipts.push(receipt);
                true
            }
            Err(e) => {
                self.ctx
                    .logger()
                    .warn(format!("{}: skipped interception: {}", self.guard, e));
                false
            }
        }
    }

    /// 注册监听器
    pub fn listen<F>(&mut self, kind: EventKind, phase: Phase, listener: F)
    where
        F: Fn(&HostEvent, &mut EventControl) + Send + Sync + 'static,
    {
        let id = self
            .ctx
            .env()
            .events()
            .add_listener(kind, phase, Arc::new(listener));
        self.installed.listeners.push(id);
    }

    /// 周期任务
    pub fn every<F>(&mut self, period: Duration, task: F)
    where
        F: FnMut() + Send + 'static,
    {
        let handle = self.ctx.env().scheduler().set_interval(period, Box::new(task));
        self.installed.tasks.push(handle);
    }

    /// 延迟任务
    pub fn after<F>(&mut self, delay: Duration, task: F)
    where
        F: FnMut() + Send + 'static,
    {
        let handle = self.ctx.env().scheduler().set_timeout(delay, Box::new(task));
        self.installed.tasks.push(handle);
    }
}
