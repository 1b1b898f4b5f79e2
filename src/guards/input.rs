//! 输入事件守卫
//!
//! 在 capture 阶段拦截右键菜单、非主键点击、配置的快捷键、多点触控、
//! 拖放和文本选择。表单控件和管理操作元素不受影响。

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::error::Result;
use crate::host::{Element, EventControl, EventKind, HostEvent, Phase, Shortcut};

const NAME: &str = "InputGuard";

/// 标记管理操作元素的属性
pub const ADMIN_ACTION_ATTRIBUTE: &str = "data-admin-action";

#[derive(Debug)]
pub struct InputGuard {
    core: GuardCore,
}

impl Default for InputGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl InputGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

/// 不受拦截的目标
fn is_exempt(target: &Element, admin_ids: &[String]) -> bool {
    target.is_form_control()
        || target.has_attribute(ADMIN_ACTION_ATTRIBUTE)
        || target
            .id
            .as_deref()
            .is_some_and(|id| admin_ids.iter().any(|a| a == id))
}

/// 事件是否应被拦截，返回描述
fn classify(event: &HostEvent, shortcuts: &[Shortcut]) -> Option<String> {
    match event {
        HostEvent::ContextMenu { .. } => Some("context menu".to_string()),
        HostEvent::MouseDown { button, .. } if !button.is_primary() => {
            Some(format!("{:?} mouse button", button))
        }
        HostEvent::KeyDown { key, .. } => shortcuts
            .iter()
            .any(|s| s.matches(key))
            .then(|| format!("shortcut {}", describe_key(key))),
        HostEvent::TouchStart { touches, .. } if *touches > 1 => {
            Some(format!("{}-finger gesture", touches))
        }
        HostEvent::DragStart { .. } => Some("drag".to_string()),
        HostEvent::Drop { .. } => Some("drop".to_string()),
        HostEvent::SelectStart { .. } => Some("text selection".to_string()),
        _ => None,
    }
}

fn describe_key(key: &crate::host::KeyInput) -> String {
    let mut parts = Vec::new();
    if key.ctrl || key.meta {
        parts.push("Ctrl");
    }
    if key.shift {
        parts.push("Shift");
    }
    if key.alt {
        parts.push("Alt");
    }
    parts.push(key.key.as_str());
    parts.join("+")
}

impl Guard for InputGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let config = ctx.config();

            let mut kinds = Vec::new();
            if config.block_context_menu {
                kinds.push(EventKind::ContextMenu);
            }
            if config.block_non_primary_buttons {
                kinds.push(EventKind::MouseDown);
            }
            if config.block_shortcuts {
                kinds.push(EventKind::KeyDown);
            }
            if config.block_touch_gestures {
                kinds.push(EventKind::TouchStart);
            }
            if config.block_drag_drop {
                kinds.push(EventKind::DragStart);
                kinds.push(EventKind::Drop);
            }
            if config.block_text_selection {
                kinds.push(EventKind::SelectStart);
            }

            let shortcuts: Arc<Vec<Shortcut>> = Arc::new(
                config
                    .blocked_shortcuts
                    .iter()
                    .map(|s| Shortcut::parse(s))
                    .collect(),
            );
            let admin_ids: Arc<Vec<String>> = Arc::new(config.admin_action_ids.clone());

            for kind in kinds {
                let ctx = ctx.clone();
                let shortcuts = Arc::clone(&shortcuts);
                let admin_ids = Arc::clone(&admin_ids);
                inst.listen(kind, Phase::Capture, move |event, control: &mut EventControl| {
                    if event.target().is_some_and(|t| is_exempt(t, &admin_ids)) {
                        return;
                    }
                    let Some(what) = classify(event, &shortcuts) else {
                        return;
                    };
                    control.prevent_default();
                    control.stop_propagation();

                    if ctx.config().input_lockdown_on_violation {
                        ctx.violation(NAME, format!("blocked {}", what));
                    } else {
                        ctx.logger().warn(format!("{}: blocked {}", NAME, what));
                    }
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
    use crate::host::{KeyInput, MouseButton};

    fn no_lockdown() -> ShieldConfig {
        ShieldConfig {
            input_lockdown_on_violation: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_context_menu_blocked() {
        let (host, ctx) = context(ShieldConfig::default());
        InputGuard::new().initialize(&ctx).unwrap();

        let outcome = host.env().dispatch(&HostEvent::ContextMenu {
            target: Element::new("div"),
        });
        assert!(outcome.default_prevented);
        assert!(outcome.propagation_stopped);
        assert_eq!(ctx.lockdown().reason(), Some("InputGuard: blocked context menu"));
    }

    #[test]
    fn test_without_lockdown_only_logs() {
        let (host, ctx) = context(no_lockdown());
        InputGuard::new().initialize(&ctx).unwrap();

        let outcome = host.env().dispatch(&HostEvent::MouseDown {
            target: Element::new("img"),
            button: MouseButton::Middle,
        });
        assert!(outcome.default_prevented);
        assert!(!ctx.lockdown().is_triggered());
        assert_eq!(ctx.logger().count_matching("Middle mouse button"), 1);

        let outcome = host.env().dispatch(&HostEvent::MouseDown {
            target: Element::new("img"),
            button: MouseButton::Primary,
        });
        assert!(!outcome.default_prevented);
    }

    #[test]
    fn test_shortcuts() {
        let (host, ctx) = context(no_lockdown());
        InputGuard::new().initialize(&ctx).unwrap();

        let key = |combo: &str| HostEvent::KeyDown {
            target: Element::new("body"),
            key: KeyInput::parse(combo),
        };
        assert!(host.env().dispatch(&key("Ctrl+Shift+I")).default_prevented);
        assert!(host.env().dispatch(&key("F5")).default_prevented);
        assert!(!host.env().dispatch(&key("a")).default_prevented);
        assert!(!host.env().dispatch(&key("Ctrl+Z")).default_prevented);
        assert_eq!(ctx.logger().count_matching("shortcut Ctrl+Shift+i"), 1);
    }

    #[test]
    fn test_form_controls_are_exempt() {
        let (host, ctx) = context(ShieldConfig::default());
        InputGuard::new().initialize(&ctx).unwrap();

        let outcome = host.env().dispatch(&HostEvent::KeyDown {
            target: Element::input("text"),
            key: KeyInput::parse("Ctrl+A"),
        });
        assert!(!outcome.default_prevented);

        let outcome = host.env().dispatch(&HostEvent::SelectStart {
            target: Element::new("textarea"),
        });
        assert!(!outcome.default_prevented);
        assert!(!ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_admin_actions_are_exempt() {
        let config = ShieldConfig::default().with_admin_action_id("purge-cache");
        let (host, ctx) = context(config);
        InputGuard::new().initialize(&ctx).unwrap();

        let by_id = host.env().dispatch(&HostEvent::ContextMenu {
            target: Element::new("button").with_id("purge-cache"),
        });
        let by_attr = host.env().dispatch(&HostEvent::DragStart {
            target: Element::new("div").with_attribute(ADMIN_ACTION_ATTRIBUTE, "reorder"),
        });
        assert!(!by_id.default_prevented);
        assert!(!by_attr.default_prevented);
        assert!(!ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_multi_touch() {
        let (host, ctx) = context(no_lockdown());
        InputGuard::new().initialize(&ctx).unwrap();

        let single = host.env().dispatch(&HostEvent::TouchStart {
            target: Element::new("div"),
            touches: 1,
        });
        let pinch = host.env().dispatch(&HostEvent::TouchStart {
            target: Element::new("div"),
            touches: 2,
        });
        assert!(!single.default_prevented);
        assert!(pinch.default_prevented);
        assert_eq!(ctx.logger().count_matching("2-finger gesture"), 1);
    }

    #[test]
    fn test_destroy_removes_listeners() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = InputGuard::new();
        guard.initialize(&ctx).unwrap();
        guard.destroy();

        let outcome = host.env().dispatch(&HostEvent::ContextMenu {
            target: Element::new("div"),
        });
        assert!(!outcome.default_prevented);
        assert_eq!(outcome.listeners_called, 0);
    }
}
