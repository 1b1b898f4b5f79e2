//! 查看源代码守卫

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::error::Result;
use crate::host::{EventKind, HostEvent, Phase, Shortcut};

const NAME: &str = "SourceViewGuard";

/// 打开源代码或开发者工具的快捷键
const VIEW_SOURCE_SHORTCUTS: &[&str] = &[
    "Ctrl+U",
    "Ctrl+S",
    "Ctrl+Shift+I",
    "Ctrl+Shift+J",
    "Ctrl+Shift+C",
    "F12",
];

const VIEW_SOURCE_SCHEME: &str = "view-source:";

/// 拦截查看源代码的快捷键与 `view-source:` 导航
///
/// 与输入守卫不同，这里不区分事件目标，表单控件内的按键同样会触发锁定。
#[derive(Debug)]
pub struct SourceViewGuard {
    core: GuardCore,
}

impl Default for SourceViewGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceViewGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for SourceViewGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if !ctx.config().block_view_source {
                return Ok(());
            }

            let shortcuts: Vec<(&'static str, Shortcut)> = VIEW_SOURCE_SHORTCUTS
                .iter()
                .map(|combo| (*combo, Shortcut::parse(combo)))
                .collect();
            let key_ctx = ctx.clone();
            inst.listen(EventKind::KeyDown, Phase::Capture, move |event, control| {
                let HostEvent::KeyDown { key, .. } = event else {
                    return;
                };
                if let Some((combo, _)) = shortcuts.iter().find(|(_, s)| s.matches(key)) {
                    control.prevent_default();
                    control.stop_propagation();
                    key_ctx.violation(NAME, format!("view-source shortcut {}", combo));
                }
            });

            let nav_ctx = ctx.clone();
            inst.listen(EventKind::BeforeNavigate, Phase::Capture, move |event, control| {
                let HostEvent::BeforeNavigate { url } = event else {
                    return;
                };
                if url.trim_start().to_ascii_lowercase().starts_with(VIEW_SOURCE_SCHEME) {
                    control.prevent_default();
                    nav_ctx.violation(NAME, "view-source navigation");
                }
            });
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
    use crate::host::{Element, KeyInput};

    fn key(combo: &str) -> HostEvent {
        HostEvent::KeyDown {
            target: Element::input("text"),
            key: KeyInput::parse(combo),
        }
    }

    #[test]
    fn test_ctrl_u_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        SourceViewGuard::new().initialize(&ctx).unwrap();

        let outcome = host.env().dispatch(&key("ctrl+u"));
        assert!(outcome.default_prevented);
        assert_eq!(
            ctx.lockdown().reason(),
            Some("SourceViewGuard: view-source shortcut Ctrl+U")
        );
    }

    #[test]
    fn test_other_keys_pass() {
        let (host, ctx) = context(ShieldConfig::default());
        SourceViewGuard::new().initialize(&ctx).unwrap();

        host.env().dispatch(&key("Ctrl+Z"));
        host.env().dispatch(&key("u"));
        assert!(!ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_view_source_navigation() {
        let (host, ctx) = context(ShieldConfig::default());
        SourceViewGuard::new().initialize(&ctx).unwrap();

        host.env().dispatch(&HostEvent::BeforeNavigate {
            url: "https://app.example.com/next".to_string(),
        });
        assert!(!ctx.lockdown().is_triggered());

        let outcome = host.env().dispatch(&HostEvent::BeforeNavigate {
            url: "View-Source:https://app.example.com/".to_string(),
        });
        assert!(outcome.default_prevented);
        assert!(ctx.lockdown().is_triggered());
    }
}
