//! 性能计时守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, InterceptMode, PerformanceGateway};

const NAME: &str = "PerformanceGuard";

/// 替换高精度计时入口
#[derive(Debug)]
pub struct PerformanceGuard {
    core: GuardCore,
}

impl Default for PerformanceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for PerformanceGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if ctx.config().block_performance {
                let wire: Arc<dyn PerformanceGateway> =
                    Tripwire::new(NAME, Capability::Performance, ctx);
                inst.intercept(ctx.env().performance(), wire, InterceptMode::Reversible);
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
