//! 异常守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, ErrorGateway, EventKind, HostEvent, InterceptMode, Phase};

const NAME: &str = "ExceptionGuard";

/// 未捕获错误与未处理的 rejection 视为违规；错误上报入口替换为绊线
#[derive(Debug)]
pub struct ExceptionGuard {
    core: GuardCore,
}

impl Default for ExceptionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for ExceptionGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if !ctx.config().intercept_errors {
                return Ok(());
            }

            let wire: Arc<dyn ErrorGateway> = Tripwire::new(NAME, Capability::ErrorReporting, ctx);
            inst.intercept(ctx.env().error_reporting(), wire, InterceptMode::Reversible);

            for kind in [EventKind::Error, EventKind::UnhandledRejection] {
                let ctx = ctx.clone();
                inst.listen(kind, Phase::Capture, move |event, control| {
                    let detail = match event {
                        HostEvent::Error { message } => format!("uncaught error: {}", message),
                        HostEvent::UnhandledRejection { reason } => {
                            format!("unhandled rejection: {}", reason)
                        }
                        _ => return,
                    };
                    control.prevent_default();
                    ctx.violation(NAME, detail);
                });
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
    fn test_error_event_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        ExceptionGuard::new().initialize(&ctx).unwrap();

        let outcome = host.env().dispatch(&HostEvent::Error {
            message: "TypeError: x is undefined".to_string(),
        });
        assert!(outcome.default_prevented);
        assert_eq!(
            ctx.lockdown().reason(),
            Some("ExceptionGuard: uncaught error: TypeError: x is undefined")
        );
    }

    #[test]
    fn test_rejection_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        ExceptionGuard::new().initialize(&ctx).unwrap();

        host.env().dispatch(&HostEvent::UnhandledRejection {
            reason: "network down".to_string(),
        });
        assert!(ctx.lockdown().reason().unwrap().contains("unhandled rejection"));
    }

    #[test]
    fn test_report_gateway_replaced() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = ExceptionGuard::new();
        guard.initialize(&ctx).unwrap();

        assert!(host.env().error_reporting().get().report("oops").is_err());
        assert!(host.errors.reports().is_empty());

        guard.destroy();
        host.env().error_reporting().get().report("after").unwrap();
        assert_eq!(host.errors.reports(), vec!["after".to_string()]);
    }
}
