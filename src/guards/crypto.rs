//! 加密能力守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, CryptoGateway, InterceptMode};

const NAME: &str = "CryptoGuard";

/// 替换随机数与摘要入口
#[derive(Debug)]
pub struct CryptoGuard {
    core: GuardCore,
}

impl Default for CryptoGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for CryptoGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if ctx.config().block_crypto {
                let wire: Arc<dyn CryptoGateway> = Tripwire::new(NAME, Capability::Crypto, ctx);
                inst.intercept(ctx.env().crypto(), wire, InterceptMode::Reversible);
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
    fn test_digest_is_blocked() {
        let (host, ctx) = context(ShieldConfig::default());
        CryptoGuard::new().initialize(&ctx).unwrap();

        let mut buf = [0u8; 16];
        assert!(host.env().crypto().get().random_values(&mut buf).is_err());
        assert_eq!(buf, [0u8; 16]);
        assert!(ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_disabled() {
        let config = ShieldConfig {
            block_crypto: false,
            ..Default::default()
        };
        let (host, ctx) = context(config);
        let guard = CryptoGuard::new();
        guard.initialize(&ctx).unwrap();

        assert_eq!(guard.state(), GuardState::Active);
        assert_eq!(host.env().crypto().get().digest(b"abc").unwrap().len(), 32);
    }
}
