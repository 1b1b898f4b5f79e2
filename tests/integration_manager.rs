//! 集成测试：管理器挂载与卸载
//!
//! 测试完整挂载流程、幂等性、卸载后的清理以及违规触发锁定。

use shieldrs::host::{Capability, Element, EventKind, HostEvent, MemoryHost, WindowMetrics};
use shieldrs::{GuardState, LogLevel, ShieldConfig, ShieldManager};
use std::time::Duration;

fn docked(gap: u32) -> WindowMetrics {
    WindowMetrics {
        outer_width: 1280,
        outer_height: 800 + gap,
        inner_width: 1280,
        inner_height: 800,
    }
}

/// 测试默认配置下的完整挂载
#[test]
fn test_full_mount() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), None).unwrap();

    let active = manager.mount();
    assert_eq!(active, manager.status().len());
    assert!(manager.is_mounted());

    // 全部能力都被替换
    for cap in Capability::ALL {
        assert!(host.env().is_intercepted(cap), "{} not intercepted", cap);
    }

    let logs = manager.logger().get_logs();
    assert!(logs[0].message.starts_with("Mounting"));
    assert_eq!(
        manager
            .logger()
            .count_matching(&format!("Shield mounted with {} active guards", active)),
        1
    );
    assert!(manager.logger().entries_by_level(LogLevel::Error).is_empty());
}

/// 测试重复挂载不会重复安装监听器
#[test]
fn test_mount_twice_registers_listeners_once() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), None).unwrap();

    manager.mount();
    let copy_listeners = host.env().events().listener_count(EventKind::Copy);
    manager.mount();

    assert_eq!(
        host.env().events().listener_count(EventKind::Copy),
        copy_listeners
    );

    let outcome = host.env().dispatch(&HostEvent::Copy {
        target: Element::new("p"),
    });
    assert_eq!(outcome.listeners_called, 1);
    assert!(outcome.default_prevented);
}

/// 测试卸载恢复可恢复的能力，永久拦截保留
#[test]
fn test_unmount_restores_reversible_capabilities() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), None).unwrap();
    manager.mount();
    manager.unmount();

    assert!(!manager.is_mounted());
    assert!(!host.env().is_intercepted(Capability::Fetch));
    assert!(!host.env().is_intercepted(Capability::Timers));
    assert!(!host.env().is_intercepted(Capability::Console));

    // 永久拦截无法恢复
    assert!(host.env().is_intercepted(Capability::LocalStorage));
    assert!(host.env().is_intercepted(Capability::Location));

    for kind in [EventKind::Copy, EventKind::Submit, EventKind::KeyDown] {
        assert_eq!(host.env().events().listener_count(kind), 0);
    }

    let partial = manager
        .status()
        .iter()
        .filter(|s| s.state == GuardState::Destroyed { partial: true })
        .count();
    assert_eq!(partial, 4);
    assert_eq!(manager.logger().count_matching("Shield unmounted"), 1);
}

/// 测试卸载后轮询不再产生日志
#[test]
fn test_unmount_stops_polling() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), None).unwrap();
    manager.mount();

    host.advance(Duration::from_millis(500));
    assert!(host.console.clear_count() >= 10);

    manager.unmount();
    let logged = manager.logger().len();
    let clears = host.console.clear_count();
    let reads = host.viewport.reads();

    host.viewport.set(docked(400));
    host.advance(Duration::from_secs(30));

    assert_eq!(manager.logger().len(), logged);
    assert_eq!(host.console.clear_count(), clears);
    assert_eq!(host.viewport.reads(), reads);
    assert!(!manager.lockdown().is_triggered());
    assert_eq!(host.scheduler.pending_tasks(), 0);
}

/// 测试页面脚本访问被拦截的能力会触发锁定
#[test]
fn test_tripwire_access_triggers_lockdown() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), None).unwrap();
    manager.mount();

    let stored = host.env().local_storage().get().get_item("token").unwrap();
    assert!(stored.is_none());

    assert!(manager.lockdown().is_triggered());
    assert!(host.dom.rendered().is_some());
    assert_eq!(
        host.location.history().last().map(String::as_str),
        Some("about:blank")
    );
}

/// 测试右键菜单在非表单元素上触发锁定，在表单控件上放行
#[test]
fn test_context_menu_policy() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), None).unwrap();
    manager.mount();

    let outcome = host.env().dispatch(&HostEvent::ContextMenu {
        target: Element::input("text").in_form("login"),
    });
    assert!(!outcome.default_prevented);
    assert!(!manager.lockdown().is_triggered());

    let outcome = host.env().dispatch(&HostEvent::ContextMenu {
        target: Element::new("div"),
    });
    assert!(outcome.default_prevented);
    assert!(manager.lockdown().is_triggered());
}

/// 测试 relaxed 预设只保留表单策略
#[test]
fn test_relaxed_preset_keeps_form_policies() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), Some(ShieldConfig::relaxed())).unwrap();
    manager.mount();

    assert!(host.env().intercepted().is_empty());
    assert_eq!(host.env().events().listener_count(EventKind::ContextMenu), 0);
    assert!(host.env().events().listener_count(EventKind::Submit) > 0);
}
