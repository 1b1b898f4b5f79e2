//! 导航守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, EventKind, HostEvent, InterceptMode, NavigationGateway, Phase};

const NAME: &str = "NavigationGuard";

/// 替换 history（可恢复）与 location（永久），并把前进后退和锚点变化视为违规
///
/// 锁定跳转使用原始 location 网关，不受这里的替换影响。
#[derive(Debug)]
pub struct NavigationGuard {
    core: GuardCore,
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for NavigationGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let env = ctx.env();
            let config = ctx.config();

            if config.block_history {
                let wire: Arc<dyn NavigationGateway> =
                    Tripwire::new(NAME, Capability::History, ctx);
                inst.intercept(env.history(), wire, InterceptMode::Reversible);
            }
            if config.block_location {
                let wire: Arc<dyn NavigationGateway> =
                    Tripwire::new(NAME, Capability::Location, ctx);
                inst.intercept(env.location(), wire, InterceptMode::Permanent);
            }

            if config.block_navigation_events {
                for kind in [EventKind::PopState, EventKind::HashChange] {
                    let ctx = ctx.clone();
                    inst.listen(kind, Phase::Capture, move |event, control| {
                        let url = match event {
                            HostEvent::PopState { url } | HostEvent::HashChange { url } => url,
                            _ => return,
                        };
                        control.prevent_default();
                        ctx.violation(NAME, format!("{} to {}", kind, url));
                    });
                }
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
    use crate::lockdown::LOCKDOWN_URL;

    #[test]
    fn test_push_state_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        NavigationGuard::new().initialize(&ctx).unwrap();

        assert!(host.env().history().get().push_state("/admin").is_err());
        assert!(ctx.lockdown().is_triggered());
        // 锁定仍然能跳转
        assert_eq!(host.location.current_url(), LOCKDOWN_URL);
    }

    #[test]
    fn test_popstate_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        NavigationGuard::new().initialize(&ctx).unwrap();

        host.env().dispatch(&HostEvent::HashChange {
            url: "https://app.example.com/#debug".to_string(),
        });
        assert_eq!(
            ctx.lockdown().reason(),
            Some("NavigationGuard: hashchange to https://app.example.com/#debug")
        );
    }

    #[test]
    fn test_destroy_is_partial() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = NavigationGuard::new();
        guard.initialize(&ctx).unwrap();
        guard.destroy();

        assert_eq!(guard.state(), GuardState::Destroyed { partial: true });
        assert!(!host.env().is_intercepted(Capability::History));
        assert!(host.env().is_sealed(Capability::Location));
    }
}
