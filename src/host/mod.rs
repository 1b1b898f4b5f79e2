//! 宿主环境抽象
//!
//! 宿主程序的每一种能力（定时器、存储、网络、DOM、剪贴板等）都通过一个网关 trait
//! 暴露，并存放在 [`Environment`] 的 [`GatewaySlot`] 中。守卫模块通过替换插槽
//! 中的实现完成拦截，并在销毁时恢复（永久拦截除外）。
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::host::{Capability, MemoryHost};
//!
//! let host = MemoryHost::new();
//! let env = host.env();
//!
//! env.local_storage().get().set_item("theme", "dark").unwrap();
//! assert_eq!(
//!     env.local_storage().get().get_item("theme").unwrap().as_deref(),
//!     Some("dark")
//! );
//! assert!(!env.is_intercepted(Capability::LocalStorage));
//! ```

mod event;
mod gateway;
mod memory;
mod scheduler;
mod slot;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::SharedClock;

pub use event::{
    DispatchOutcome, Element, EventBus, EventControl, EventKind, HostEvent, KeyInput, Listener,
    ListenerId, MouseButton, Phase, Shortcut,
};
pub use gateway::{
    ClipboardGateway, ConsoleGateway, ConsoleLevel, CryptoGateway, DebuggerMonitor, DomGateway,
    DomMutation, ElementRef, ErrorGateway, EvalGateway, FetchRequest, FetchResponse, FileGateway,
    GatewayResult, NavigationGateway, NavigatorGateway, NavigatorInfo, NetworkGateway,
    PerformanceGateway, StorageGateway, StreamGateway, StreamId, TimerCallback, TimerGateway,
    TimerId, ViewportGateway, WindowMetrics,
};
pub use memory::{
    MemoryClipboard, MemoryConsole, MemoryCrypto, MemoryDebugger, MemoryDom, MemoryErrors,
    MemoryEval, MemoryFiles, MemoryHost, MemoryNavigation, MemoryNavigator, MemoryNetwork,
    MemoryPerformance, MemoryStorage, MemoryStreams, MemoryTimers, MemoryViewport,
};
#[cfg(feature = "tokio-scheduler")]
pub use scheduler::TokioScheduler;
pub use scheduler::{ManualScheduler, Scheduler, TaskFn, TaskHandle};
pub use slot::{GatewaySlot, InterceptMode, InterceptReceipt, RestoreOutcome};

/// 可拦截的能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    Timers,
    Eval,
    Console,
    Fetch,
    WebSocket,
    EventSource,
    LocalStorage,
    SessionStorage,
    Dom,
    Clipboard,
    History,
    Location,
    Performance,
    Crypto,
    FileAccess,
    ErrorReporting,
}

impl Capability {
    /// 全部能力
    pub const ALL: [Capability; 16] = [
        Capability::Timers,
        Capability::Eval,
        Capability::Console,
        Capability::Fetch,
        Capability::WebSocket,
        Capability::EventSource,
        Capability::LocalStorage,
        Capability::SessionStorage,
        Capability::Dom,
        Capability::Clipboard,
        Capability::History,
        Capability::Location,
        Capability::Performance,
        Capability::Crypto,
        Capability::FileAccess,
        Capability::ErrorReporting,
    ];

    /// 宿主中的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Timers => "setTimeout",
            Capability::Eval => "eval",
            Capability::Console => "console",
            Capability::Fetch => "fetch",
            Capability::WebSocket => "WebSocket",
            Capability::EventSource => "EventSource",
            Capability::LocalStorage => "localStorage",
            Capability::SessionStorage => "sessionStorage",
            Capability::Dom => "document",
            Capability::Clipboard => "clipboard",
            Capability::History => "history",
            Capability::Location => "location",
            Capability::Performance => "performance",
            Capability::Crypto => "crypto",
            Capability::FileAccess => "FileReader",
            Capability::ErrorReporting => "onerror",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 构建 [`Environment`] 所需的全部原始实现
pub struct HostParts {
    pub timers: Arc<dyn TimerGateway>,
    pub eval: Arc<dyn EvalGateway>,
    pub console: Arc<dyn ConsoleGateway>,
    pub fetch: Arc<dyn NetworkGateway>,
    pub websocket: Arc<dyn StreamGateway>,
    pub event_source: Arc<dyn StreamGateway>,
    pub local_storage: Arc<dyn StorageGateway>,
    pub session_storage: Arc<dyn StorageGateway>,
    pub dom: Arc<dyn DomGateway>,
    pub clipboard: Arc<dyn ClipboardGateway>,
    pub history: Arc<dyn NavigationGateway>,
    pub location: Arc<dyn NavigationGateway>,
    pub performance: Arc<dyn PerformanceGateway>,
    pub crypto: Arc<dyn CryptoGateway>,
    pub file_access: Arc<dyn FileGateway>,
    pub error_reporting: Arc<dyn ErrorGateway>,
    pub viewport: Arc<dyn ViewportGateway>,
    pub debugger: Arc<dyn DebuggerMonitor>,
    pub navigator: Arc<dyn NavigatorGateway>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: SharedClock,
}

/// 宿主环境
pub struct Environment {
    timers: GatewaySlot<dyn TimerGateway>,
    eval: GatewaySlot<dyn EvalGateway>,
    console: GatewaySlot<dyn ConsoleGateway>,
    fetch: GatewaySlot<dyn NetworkGateway>,
    websocket: GatewaySlot<dyn StreamGateway>,
    event_source: GatewaySlot<dyn StreamGateway>,
    local_storage: GatewaySlot<dyn StorageGateway>,
    session_storage: GatewaySlot<dyn StorageGateway>,
    dom: GatewaySlot<dyn DomGateway>,
    clipboard: GatewaySlot<dyn ClipboardGateway>,
    history: GatewaySlot<dyn NavigationGateway>,
    location: GatewaySlot<dyn NavigationGateway>,
    performance: GatewaySlot<dyn PerformanceGateway>,
    crypto: GatewaySlot<dyn CryptoGateway>,
    file_access: GatewaySlot<dyn FileGateway>,
    error_reporting: GatewaySlot<dyn ErrorGateway>,
    viewport: Arc<dyn ViewportGateway>,
    debugger: Arc<dyn DebuggerMonitor>,
    navigator: Arc<dyn NavigatorGateway>,
    events: EventBus,
    scheduler: Arc<dyn Scheduler>,
    clock: SharedClock,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("intercepted", &self.intercepted())
            .field("events", &self.events)
            .finish()
    }
}

/// 按能力分派到对应插槽
macro_rules! with_slot {
    ($env:expr, $cap:expr, |$slot:ident| $body:expr) => {
        match $cap {
            Capability::Timers => { let $slot = &$env.timers; $body }
            Capability::Eval => { let $slot = &$env.eval; $body }
            Capability::Console => { let $slot = &$env.console; $body }
            Capability::Fetch => { let $slot = &$env.fetch; $body }
            Capability::WebSocket => { let $slot = &$env.websocket; $body }
            Capability::EventSource => { let $slot = &$env.event_source; $body }
            Capability::LocalStorage => { let $slot = &$env.local_storage; $body }
            Capability::SessionStorage => { let $slot = &$env.session_storage; $body }
            Capability::Dom => { let $slot = &$env.dom; $body }
            Capability::Clipboard => { let $slot = &$env.clipboard; $body }
            Capability::History => { let $slot = &$env.history; $body }
            Capability::Location => { let $slot = &$env.location; $body }
            Capability::Performance => { let $slot = &$env.performance; $body }
            Capability::Crypto => { let $slot = &$env.crypto; $body }
            Capability::FileAccess => { let $slot = &$env.file_access; $body }
            Capability::ErrorReporting => { let $slot = &$env.error_reporting; $body }
        }
    };
}

impl Environment {
    pub fn new(parts: HostParts) -> Self {
        Self {
            timers: GatewaySlot::new(Capability::Timers, parts.timers),
            eval: GatewaySlot::new(Capability::Eval, parts.eval),
            console: GatewaySlot::new(Capability::Console, parts.console),
            fetch: GatewaySlot::new(Capability::Fetch, parts.fetch),
            websocket: GatewaySlot::new(Capability::WebSocket, parts.websocket),
            event_source: GatewaySlot::new(Capability::EventSource, parts.event_source),
            local_storage: GatewaySlot::new(Capability::LocalStorage, parts.local_storage),
            session_storage: GatewaySlot::new(Capability::SessionStorage, parts.session_storage),
            dom: GatewaySlot::new(Capability::Dom, parts.dom),
            clipboard: GatewaySlot::new(Capability::Clipboard, parts.clipboard),
            history: GatewaySlot::new(Capability::History, parts.history),
            location: GatewaySlot::new(Capability::Location, parts.location),
            performance: GatewaySlot::new(Capability::Performance, parts.performance),
            crypto: GatewaySlot::new(Capability::Crypto, parts.crypto),
            file_access: GatewaySlot::new(Capability::FileAccess, parts.file_access),
            error_reporting: GatewaySlot::new(Capability::ErrorReporting, parts.error_reporting),
            viewport: parts.viewport,
            debugger: parts.debugger,
            navigator: parts.navigator,
            events: EventBus::new(),
            scheduler: parts.scheduler,
            clock: parts.clock,
        }
    }

    pub fn timers(&self) -> &GatewaySlot<dyn TimerGateway> {
        &self.timers
    }

    pub fn eval(&self) -> &GatewaySlot<dyn EvalGateway> {
        &self.eval
    }

    pub fn console(&self) -> &GatewaySlot<dyn ConsoleGateway> {
        &self.console
    }

    pub fn fetch(&self) -> &GatewaySlot<dyn NetworkGateway> {
        &self.fetch
    }

    pub fn websocket(&self) -> &GatewaySlot<dyn StreamGateway> {
        &self.websocket
    }

    pub fn event_source(&self) -> &GatewaySlot<dyn StreamGateway> {
        &self.event_source
    }

    pub fn local_storage(&self) -> &GatewaySlot<dyn StorageGateway> {
        &self.local_storage
    }

    pub fn session_storage(&self) -> &GatewaySlot<dyn StorageGateway> {
        &self.session_storage
    }

    pub fn dom(&self) -> &GatewaySlot<dyn DomGateway> {
        &self.dom
    }

    pub fn clipboard(&self) -> &GatewaySlot<dyn ClipboardGateway> {
        &self.clipboard
    }

    pub fn history(&self) -> &GatewaySlot<dyn NavigationGateway> {
        &self.history
    }

    pub fn location(&self) -> &GatewaySlot<dyn NavigationGateway> {
        &self.location
    }

    pub fn performance(&self) -> &GatewaySlot<dyn PerformanceGateway> {
        &self.performance
    }

    pub fn crypto(&self) -> &GatewaySlot<dyn CryptoGateway> {
        &self.crypto
    }

    pub fn file_access(&self) -> &GatewaySlot<dyn FileGateway> {
        &self.file_access
    }

    pub fn error_reporting(&self) -> &GatewaySlot<dyn ErrorGateway> {
        &self.error_reporting
    }

    pub fn viewport(&self) -> &Arc<dyn ViewportGateway> {
        &self.viewport
    }

    pub fn debugger(&self) -> &Arc<dyn DebuggerMonitor> {
        &self.debugger
    }

    pub fn navigator(&self) -> &Arc<dyn NavigatorGateway> {
        &self.navigator
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// 分发宿主事件
    pub fn dispatch(&self, event: &HostEvent) -> DispatchOutcome {
        self.events.dispatch(event)
    }

    /// 恢复能力的原始实现
    pub fn restore(&self, capability: Capability) -> RestoreOutcome {
        with_slot!(self, capability, |slot| slot.restore())
    }

    /// 模拟宿主禁止重新定义某个能力
    pub fn freeze(&self, capability: Capability) {
        with_slot!(self, capability, |slot| slot.freeze())
    }

    pub fn is_intercepted(&self, capability: Capability) -> bool {
        with_slot!(self, capability, |slot| slot.is_intercepted())
    }

    pub fn is_sealed(&self, capability: Capability) -> bool {
        with_slot!(self, capability, |slot| slot.is_sealed())
    }

    /// 当前被替换的能力
    pub fn intercepted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.is_intercepted(*cap))
            .collect()
    }
}
