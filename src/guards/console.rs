//! 控制台守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, ConsoleGateway, InterceptMode};

const NAME: &str = "ConsoleGuard";

/// 静默控制台并定期清空
///
/// 清空通过拦截前捕获的原始控制台执行，不会触碰自身安装的绊线。
#[derive(Debug)]
pub struct ConsoleGuard {
    core: GuardCore,
}

impl Default for ConsoleGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for ConsoleGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let env = ctx.env();
            let config = ctx.config();

            if config.block_console {
                let wire: Arc<dyn ConsoleGateway> = Tripwire::new(NAME, Capability::Console, ctx);
                inst.intercept(env.console(), wire, InterceptMode::Reversible);
            }

            if config.clear_console {
                let original = env.console().original();
                inst.every(config.console_clear_interval, move || original.clear());
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
    use crate::host::ConsoleLevel;
    use std::time::Duration;

    #[test]
    fn test_clears_on_interval() {
        let (host, ctx) = context(ShieldConfig::default());
        ConsoleGuard::new().initialize(&ctx).unwrap();

        host.advance(Duration::from_millis(200));
        assert_eq!(host.console.clear_count(), 4);
        assert!(!ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_external_write_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        ConsoleGuard::new().initialize(&ctx).unwrap();

        host.env().console().get().write(ConsoleLevel::Log, "hello");
        assert!(host.console.lines().is_empty());
        assert!(ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_destroy_stops_clearing() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = ConsoleGuard::new();
        guard.initialize(&ctx).unwrap();

        host.advance(Duration::from_millis(100));
        guard.destroy();
        let cleared = host.console.clear_count();
        let logged = ctx.logger().len();

        host.advance(Duration::from_secs(1));
        assert_eq!(host.console.clear_count(), cleared);
        assert_eq!(ctx.logger().len(), logged);

        host.env().console().get().write(ConsoleLevel::Info, "restored");
        assert_eq!(host.console.lines().len(), 1);
    }
}
