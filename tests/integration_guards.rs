//! 集成测试：单个守卫的行为
//!
//! 每个测试只开启一个能力域的开关，通过管理器挂载后驱动宿主事件和虚拟时间。

use shieldrs::guards::{Guard, GuardContext, StorageGuard};
use shieldrs::host::{
    Element, EventKind, HostEvent, KeyInput, MemoryHost, WindowMetrics,
};
use shieldrs::{GuardState, ShieldConfig, ShieldManager};
use std::time::Duration;

fn mount(config: ShieldConfig) -> (MemoryHost, ShieldManager) {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), Some(config)).unwrap();
    manager.mount();
    (host, manager)
}

fn gap(height_gap: u32, width_gap: u32) -> WindowMetrics {
    WindowMetrics {
        outer_width: 1280 + width_gap,
        outer_height: 800 + height_gap,
        inner_width: 1280,
        inner_height: 800,
    }
}

/// 测试开发者工具尺寸阈值：160 不触发，161 触发
#[test]
fn test_devtools_dimension_boundary() {
    let mut config = ShieldConfig::all_disabled();
    config.detect_devtools = true;
    let (host, manager) = mount(config);

    host.viewport.set(gap(160, 160));
    host.advance(Duration::from_secs(1));
    assert!(!manager.lockdown().is_triggered());

    host.viewport.set(gap(0, 161));
    host.advance(Duration::from_millis(100));
    assert!(manager.lockdown().is_triggered());
}

/// 测试重复初始化只安装一次
#[test]
fn test_repeated_initialize_installs_once() {
    let host = MemoryHost::new();
    let ctx = GuardContext::new(host.env(), ShieldConfig::default()).unwrap();
    let guard = StorageGuard::new();

    guard.initialize(&ctx).unwrap();
    guard.initialize(&ctx).unwrap();

    assert_eq!(guard.state(), GuardState::Active);
    assert_eq!(ctx.logger().count_matching("StorageGuard initialized"), 1);
    assert_eq!(ctx.logger().count_matching("skipped interception"), 0);
}

/// 测试观察期内没有交互时判定为机器人
#[test]
fn test_bot_without_interaction() {
    let mut config = ShieldConfig::all_disabled();
    config.detect_bots = true;
    let (host, manager) = mount(config);

    host.advance(Duration::from_millis(9_999));
    assert!(!manager.lockdown().is_triggered());

    host.advance(Duration::from_millis(1));
    assert!(manager.lockdown().is_triggered());
    assert!(
        manager
            .lockdown()
            .reason()
            .unwrap()
            .contains("insufficient interaction")
    );
}

/// 测试足够的鼠标移动可以通过检查，突发事件合并计数
#[test]
fn test_bot_with_human_interaction() {
    let mut config = ShieldConfig::all_disabled();
    config.detect_bots = true;
    let (host, manager) = mount(config);

    // 同一突发内的事件只计一次
    for _ in 0..20 {
        host.env().dispatch(&HostEvent::MouseMove { x: 1, y: 1 });
    }
    for i in 0..5 {
        host.advance(Duration::from_millis(150));
        host.env().dispatch(&HostEvent::MouseMove { x: i, y: i });
    }

    host.advance(Duration::from_secs(10));
    assert!(!manager.lockdown().is_triggered());
    assert_eq!(manager.logger().count_matching("interaction check passed"), 1);
}

/// 测试无头浏览器的 User-Agent
#[test]
fn test_headless_user_agent() {
    let host = MemoryHost::new();
    host.navigator.update(|info| {
        info.user_agent = "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/120.0".to_string();
    });

    let mut config = ShieldConfig::all_disabled();
    config.check_user_agent = true;
    let manager = ShieldManager::new(host.env(), Some(config)).unwrap();
    manager.mount();

    assert!(manager.lockdown().is_triggered());
    assert!(manager.lockdown().reason().unwrap().contains("headlesschrome"));
}

/// 测试 SQL 注入特征与正常输入
#[test]
fn test_injection_detection() {
    let mut config = ShieldConfig::all_disabled();
    config.detect_injection = true;
    let (host, manager) = mount(config);

    host.env().dispatch(&HostEvent::Input {
        target: Element::input("text")
            .with_name("search")
            .with_value("O'Brien's union station"),
    });
    assert!(!manager.lockdown().is_triggered());

    let outcome = host.env().dispatch(&HostEvent::Change {
        target: Element::input("text")
            .with_name("search")
            .with_value("' OR 1=1 --"),
    });
    assert!(outcome.default_prevented);
    assert!(manager.lockdown().is_triggered());
}

/// 测试查看源代码快捷键
#[test]
fn test_view_source_shortcut() {
    let mut config = ShieldConfig::all_disabled();
    config.block_view_source = true;
    let (host, manager) = mount(config);

    host.env().dispatch(&HostEvent::KeyDown {
        target: Element::new("body"),
        key: KeyInput::plain("a"),
    });
    assert!(!manager.lockdown().is_triggered());

    host.env().dispatch(&HostEvent::KeyDown {
        target: Element::new("body"),
        key: KeyInput::parse("Ctrl+U"),
    });
    assert!(manager.lockdown().is_triggered());
}

/// 测试锁定只执行一次
#[test]
fn test_lockdown_is_one_way() {
    let mut config = ShieldConfig::all_disabled();
    config.intercept_errors = true;
    config.block_navigation_events = true;
    let (host, manager) = mount(config);

    host.env().dispatch(&HostEvent::Error {
        message: "boom".to_string(),
    });
    host.env().dispatch(&HostEvent::PopState {
        url: "https://app.example.com/back".to_string(),
    });

    assert_eq!(manager.lockdown().trigger_count(), 2);
    assert!(manager.lockdown().reason().unwrap().contains("boom"));
    assert_eq!(manager.logger().count_matching("Lockdown triggered"), 1);
    assert_eq!(
        host.location
            .history()
            .iter()
            .filter(|url| url.as_str() == "about:blank")
            .count(),
        1
    );
    assert_eq!(host.env().events().listener_count(EventKind::Error), 1);
}
