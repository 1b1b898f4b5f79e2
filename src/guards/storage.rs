//! 存储守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, InterceptMode, StorageGateway};

const NAME: &str = "StorageGuard";

/// 永久替换 localStorage 与 sessionStorage
///
/// 永久拦截无法恢复，destroy 后状态为 `Destroyed { partial: true }`。
#[derive(Debug)]
pub struct StorageGuard {
    core: GuardCore,
}

impl Default for StorageGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for StorageGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let env = ctx.env();
            if ctx.config().block_local_storage {
                let wire: Arc<dyn StorageGateway> =
                    Tripwire::new(NAME, Capability::LocalStorage, ctx);
                inst.intercept(env.local_storage(), wire, InterceptMode::Permanent);
            }
            if ctx.config().block_session_storage {
                let wire: Arc<dyn StorageGateway> =
                    Tripwire::new(NAME, Capability::SessionStorage, ctx);
                inst.intercept(env.session_storage(), wire, InterceptMode::Permanent);
            }
            Ok(())
        })
    }

    fn destroy(&self) {
        self.core.destroy();
    }

    fn state(&self) -> GuardState {
        self.core.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShieldConfig;
    use crate::guards::test_support::context;

    #[test]
    fn test_storage_access_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        host.local_storage.set_item("token", "secret").unwrap();

        StorageGuard::new().initialize(&ctx).unwrap();

        let value = host.env().local_storage().get().get_item("token").unwrap();
        assert_eq!(value, None);
        assert!(ctx.lockdown().is_triggered());
        assert_eq!(ctx.lockdown().reason(), Some("StorageGuard: localStorage access"));
    }

    #[test]
    fn test_destroy_is_partial() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = StorageGuard::new();
        guard.initialize(&ctx).unwrap();
        guard.destroy();

        assert_eq!(guard.state(), GuardState::Destroyed { partial: true });
        assert!(host.env().is_sealed(Capability::LocalStorage));
        assert!(host.env().is_sealed(Capability::SessionStorage));
        assert_eq!(ctx.logger().count_matching("cannot be restored"), 2);
    }

    #[test]
    fn test_session_only() {
        let config = ShieldConfig {
            block_local_storage: false,
            ..Default::default()
        };
        let (host, ctx) = context(config);
        let guard = StorageGuard::new();
        guard.initialize(&ctx).unwrap();

        host.env().local_storage().get().set_item("k", "v").unwrap();
        assert_eq!(host.local_storage.len(), 1);
        assert!(!ctx.lockdown().is_triggered());
    }
}
