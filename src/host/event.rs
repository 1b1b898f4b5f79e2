//! 宿主事件模型与事件总线
//!
//! 事件分发分为 capture 和 bubble 两个阶段。监听器可以阻止默认行为、
//! 停止传播或立即停止传播；宿主根据 [`DispatchOutcome`] 决定是否执行默认动作
//! （例如提交表单、弹出右键菜单）。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// 鼠标按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
    Back,
    Forward,
}

impl MouseButton {
    pub fn is_primary(&self) -> bool {
        matches!(self, MouseButton::Primary)
    }
}

/// 键盘输入
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyInput {
    /// 无修饰键
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// 解析 `Ctrl+Shift+I` 形式的组合键
    pub fn parse(combo: &str) -> Self {
        let shortcut = Shortcut::parse(combo);
        Self {
            key: shortcut.key,
            ctrl: shortcut.ctrl,
            shift: shortcut.shift,
            alt: shortcut.alt,
            meta: false,
        }
    }
}

/// 快捷键定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    /// 小写键名
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Shortcut {
    /// 解析 `Ctrl+Shift+I`、`F12`、`Alt+Left` 等写法，大小写不敏感
    pub fn parse(combo: &str) -> Self {
        let mut shortcut = Shortcut {
            key: String::new(),
            ctrl: false,
            shift: false,
            alt: false,
        };
        for part in combo.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "cmd" | "meta" => shortcut.ctrl = true,
                "shift" => shortcut.shift = true,
                "alt" | "option" => shortcut.alt = true,
                key => shortcut.key = normalize_key(key),
            }
        }
        shortcut
    }

    /// 是否匹配按键（meta 视为 ctrl）
    pub fn matches(&self, input: &KeyInput) -> bool {
        normalize_key(&input.key) == self.key
            && (input.ctrl || input.meta) == self.ctrl
            && input.shift == self.shift
            && input.alt == self.alt
    }
}

fn normalize_key(key: &str) -> String {
    match key.to_ascii_lowercase().as_str() {
        "arrowleft" => "left".to_string(),
        "arrowright" => "right".to_string(),
        other => other.to_string(),
    }
}

/// 事件目标元素
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    /// `type` 属性
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub value: String,
    /// 所属表单 id
    pub form_id: Option<String>,
    pub attributes: HashMap<String, String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// `<input type=...>`
    pub fn input(input_type: &str) -> Self {
        Self::new("input").with_type(input_type)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into().to_ascii_lowercase());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn in_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn is_password_field(&self) -> bool {
        self.tag == "input" && self.input_type.as_deref() == Some("password")
    }

    pub fn is_file_input(&self) -> bool {
        self.tag == "input" && self.input_type.as_deref() == Some("file")
    }

    /// 可接受用户输入的表单控件
    pub fn is_form_control(&self) -> bool {
        match self.tag.as_str() {
            "input" | "textarea" | "select" | "option" => true,
            "button" => self.form_id.is_some() && self.input_type.as_deref() == Some("submit"),
            _ => false,
        }
    }
}

/// 宿主事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Copy { target: Element },
    Cut { target: Element },
    Paste { target: Element },
    ContextMenu { target: Element },
    MouseDown { target: Element, button: MouseButton },
    MouseMove { x: i32, y: i32 },
    KeyDown { target: Element, key: KeyInput },
    TouchStart { target: Element, touches: u32 },
    DragStart { target: Element },
    Drop { target: Element },
    SelectStart { target: Element },
    Input { target: Element },
    Change { target: Element },
    /// 表单提交，`fields` 为字段名到值的映射
    Submit {
        form_id: String,
        fields: HashMap<String, String>,
    },
    PopState { url: String },
    HashChange { url: String },
    /// 即将导航到新地址
    BeforeNavigate { url: String },
    Error { message: String },
    UnhandledRejection { reason: String },
    FileSelected { target: Element, file_name: String },
}

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Copy,
    Cut,
    Paste,
    ContextMenu,
    MouseDown,
    MouseMove,
    KeyDown,
    TouchStart,
    DragStart,
    Drop,
    SelectStart,
    Input,
    Change,
    Submit,
    PopState,
    HashChange,
    BeforeNavigate,
    Error,
    UnhandledRejection,
    FileSelected,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Copy => "copy",
            EventKind::Cut => "cut",
            EventKind::Paste => "paste",
            EventKind::ContextMenu => "contextmenu",
            EventKind::MouseDown => "mousedown",
            EventKind::MouseMove => "mousemove",
            EventKind::KeyDown => "keydown",
            EventKind::TouchStart => "touchstart",
            EventKind::DragStart => "dragstart",
            EventKind::Drop => "drop",
            EventKind::SelectStart => "selectstart",
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::Submit => "submit",
            EventKind::PopState => "popstate",
            EventKind::HashChange => "hashchange",
            EventKind::BeforeNavigate => "beforenavigate",
            EventKind::Error => "error",
            EventKind::UnhandledRejection => "unhandledrejection",
            EventKind::FileSelected => "fileselected",
        };
        write!(f, "{}", name)
    }
}

impl HostEvent {
    /// 表单提交事件
    pub fn submit<K, V>(
        form_id: impl Into<String>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        HostEvent::Submit {
            form_id: form_id.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::Copy { .. } => EventKind::Copy,
            HostEvent::Cut { .. } => EventKind::Cut,
            HostEvent::Paste { .. } => EventKind::Paste,
            HostEvent::ContextMenu { .. } => EventKind::ContextMenu,
            HostEvent::MouseDown { .. } => EventKind::MouseDown,
            HostEvent::MouseMove { .. } => EventKind::MouseMove,
            HostEvent::KeyDown { .. } => EventKind::KeyDown,
            HostEvent::TouchStart { .. } => EventKind::TouchStart,
            HostEvent::DragStart { .. } => EventKind::DragStart,
            HostEvent::Drop { .. } => EventKind::Drop,
            HostEvent::SelectStart { .. } => EventKind::SelectStart,
            HostEvent::Input { .. } => EventKind::Input,
            HostEvent::Change { .. } => EventKind::Change,
            HostEvent::Submit { .. } => EventKind::Submit,
            HostEvent::PopState { .. } => EventKind::PopState,
            HostEvent::HashChange { .. } => EventKind::HashChange,
            HostEvent::BeforeNavigate { .. } => EventKind::BeforeNavigate,
            HostEvent::Error { .. } => EventKind::Error,
            HostEvent::UnhandledRejection { .. } => EventKind::UnhandledRejection,
            HostEvent::FileSelected { .. } => EventKind::FileSelected,
        }
    }

    /// 事件目标元素（如果有）
    pub fn target(&self) -> Option<&Element> {
        match self {
            HostEvent::Copy { target }
            | HostEvent::Cut { target }
            | HostEvent::Paste { target }
            | HostEvent::ContextMenu { target }
            | HostEvent::MouseDown { target, .. }
            | HostEvent::KeyDown { target, .. }
            | HostEvent::TouchStart { target, .. }
            | HostEvent::DragStart { target }
            | HostEvent::Drop { target }
            | HostEvent::SelectStart { target }
            | HostEvent::Input { target }
            | HostEvent::Change { target }
            | HostEvent::FileSelected { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// 分发阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

/// 监听器对单次分发的控制
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventControl {
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_stopped: bool,
}

impl EventControl {
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// 跳过后续阶段
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// 不再调用任何后续监听器
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// 分发结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    /// 实际被调用的监听器数量
    pub listeners_called: usize,
}

/// 监听器
pub type Listener = Arc<dyn Fn(&HostEvent, &mut EventControl) + Send + Sync>;

/// 监听器 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    kind: EventKind,
    phase: Phase,
    listener: Listener,
}

/// 事件总线
pub struct EventBus {
    next_id: AtomicU64,
    listeners: RwLock<Vec<Registration>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.read().len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 注册监听器
    pub fn add_listener(&self, kind: EventKind, phase: Phase, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Registration {
                id,
                kind,
                phase,
                listener,
            });
        id
    }

    /// 移除监听器，返回是否存在
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|r| r.id != id);
        listeners.len() != before
    }

    /// 某类事件的监听器数量
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.read().iter().filter(|r| r.kind == kind).count()
    }

    /// 分发事件
    ///
    /// 先按注册顺序调用 capture 监听器，再调用 bubble 监听器。
    /// 调用监听器时不持有锁，监听器内部可以增删监听器。
    pub fn dispatch(&self, event: &HostEvent) -> DispatchOutcome {
        let kind = event.kind();
        let snapshot: Vec<(Phase, Listener)> = self
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| (r.phase, Arc::clone(&r.listener)))
            .collect();

        let mut control = EventControl::default();
        let mut called = 0;

        'phases: for phase in [Phase::Capture, Phase::Bubble] {
            if control.propagation_stopped {
                break;
            }
            for (_, listener) in snapshot.iter().filter(|(p, _)| *p == phase) {
                listener(event, &mut control);
                called += 1;
                if control.immediate_stopped {
                    break 'phases;
                }
            }
        }

        DispatchOutcome {
            default_prevented: control.default_prevented,
            propagation_stopped: control.propagation_stopped,
            listeners_called: called,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Registration>> {
        self.listeners.read().unwrap_or_else(|e| e.into_inner())
    }
}
