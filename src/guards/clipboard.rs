//! 剪贴板守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, ClipboardGateway, EventKind, InterceptMode, Phase};

const NAME: &str = "ClipboardGuard";

/// 剪贴板事件与 API
///
/// 复制、剪切、粘贴在 capture 阶段被取消并立即停止传播，页面自身的监听器不会收到；
/// 剪贴板 API 被永久替换。
#[derive(Debug)]
pub struct ClipboardGuard {
    core: GuardCore,
}

impl Default for ClipboardGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for ClipboardGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let config = ctx.config();

            if config.block_clipboard_events {
                for kind in [EventKind::Copy, EventKind::Cut, EventKind::Paste] {
                    let logger = ctx.logger().clone();
                    inst.listen(kind, Phase::Capture, move |_, control| {
                        control.prevent_default();
                        control.stop_immediate_propagation();
                        logger.warn(format!("{}: blocked {} event", NAME, kind));
                    });
                }
            }

            if config.block_clipboard_api {
                let wire: Arc<dyn ClipboardGateway> =
                    Tripwire::new(NAME, Capability::Clipboard, ctx);
                inst.intercept(ctx.env().clipboard(), wire, InterceptMode::Permanent);
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
