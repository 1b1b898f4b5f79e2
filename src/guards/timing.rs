//! 定时器与动态执行守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, EvalGateway, InterceptMode, TimerGateway};

const NAME: &str = "TimingGuard";

/// 替换宿主定时器和动态执行入口
#[derive(Debug)]
pub struct TimingGuard {
    core: GuardCore,
}

impl Default for TimingGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for TimingGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let env = ctx.env();
            let config = ctx.config();

            if config.block_timers {
                let wire: Arc<dyn TimerGateway> = Tripwire::new(NAME, Capability::Timers, ctx);
                inst.intercept(env.timers(), wire, InterceptMode::Reversible);
            }
            if config.block_eval {
                let wire: Arc<dyn EvalGateway> = Tripwire::new(NAME, Capability::Eval, ctx);
                inst.intercept(env.eval(), wire, InterceptMode::Reversible);
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
    use std::time::Duration;

    #[test]
    fn test_timer_call_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = TimingGuard::new();
        guard.initialize(&ctx).unwrap();

        let env = host.env();
        let result = env
            .timers()
            .get()
            .schedule(Duration::from_millis(10), false, Box::new(|| {}));
        assert!(result.is_err());
        assert_eq!(host.timers.scheduled_count(), 0);
        assert!(ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_destroy_restores_eval() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = TimingGuard::new();
        guard.initialize(&ctx).unwrap();
        guard.destroy();

        assert_eq!(guard.state(), GuardState::Destroyed { partial: false });
        assert_eq!(host.env().eval().get().evaluate("1 + 1").unwrap(), "1 + 1");
        assert_eq!(host.eval.evaluated(), 1);
        assert!(!ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_disabled_switch_leaves_slot_alone() {
        let config = ShieldConfig {
            block_eval: false,
            ..Default::default()
        };
        let (host, ctx) = context(config);
        TimingGuard::new().initialize(&ctx).unwrap();

        assert!(host.env().is_intercepted(Capability::Timers));
        assert!(!host.env().is_intercepted(Capability::Eval));
    }
}
