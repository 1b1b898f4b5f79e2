//! DOM 查询守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, DomGateway, InterceptMode};

const NAME: &str = "DomQueryGuard";

/// 替换元素查找与子树变更入口
///
/// 查找返回空结果，变更返回错误。锁定渲染走原始网关，不受影响。
#[derive(Debug)]
pub struct DomQueryGuard {
    core: GuardCore,
}

impl Default for DomQueryGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DomQueryGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for DomQueryGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if ctx.config().block_dom_access {
                let wire: Arc<dyn DomGateway> = Tripwire::new(NAME, Capability::Dom, ctx);
                inst.intercept(ctx.env().dom(), wire, InterceptMode::Reversible);
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
    use crate::host::DomMutation;
    use crate::lockdown::ACCESS_DENIED_HTML;

    #[test]
    fn test_query_returns_nothing() {
        let (host, ctx) = context(ShieldConfig::default());
        host.dom.add_element("div", Some("secret"));
        DomQueryGuard::new().initialize(&ctx).unwrap();

        let dom = host.env().dom().get();
        assert!(dom.get_element_by_id("secret").is_none());
        assert!(ctx.lockdown().is_triggered());
        // 锁定页面仍然通过原始 DOM 渲染
        assert_eq!(host.dom.rendered().as_deref(), Some(ACCESS_DENIED_HTML));
    }

    #[test]
    fn test_mutation_rejected() {
        let (host, ctx) = context(ShieldConfig::default());
        DomQueryGuard::new().initialize(&ctx).unwrap();

        let result = host.env().dom().get().mutate(DomMutation::AppendChild {
            parent: "body".to_string(),
            html: "<script></script>".to_string(),
        });
        assert!(result.is_err());
        assert!(host.dom.mutations().is_empty());
    }

    #[test]
    fn test_destroy_restores_queries() {
        let (host, ctx) = context(ShieldConfig::default());
        host.dom.add_element("p", None);
        let guard = DomQueryGuard::new();
        guard.initialize(&ctx).unwrap();
        guard.destroy();

        assert_eq!(host.env().dom().get().query("p").len(), 1);
        assert!(!ctx.lockdown().is_triggered());
    }
}
