//! 能力网关 trait
//!
//! 每个能力域对应一个 trait。宿主程序通过 [`Environment`](super::Environment)
//! 中的插槽调用这些网关，守卫模块通过替换插槽中的实现完成拦截。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::GatewayError;

/// 网关调用结果
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// 定时器回调
pub type TimerCallback = Box<dyn FnMut() + Send>;

/// 宿主定时器 ID
pub type TimerId = u64;

/// 宿主调度原语（setTimeout / setInterval）
pub trait TimerGateway: Send + Sync {
    /// 调度一个回调；`repeat` 为 true 时周期执行
    fn schedule(&self, delay: Duration, repeat: bool, callback: TimerCallback)
    -> GatewayResult<TimerId>;

    /// 取消回调
    fn clear(&self, id: TimerId);
}

/// 动态代码执行入口
pub trait EvalGateway: Send + Sync {
    fn evaluate(&self, source: &str) -> GatewayResult<String>;
}

/// 控制台级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Table,
}

/// 控制台
pub trait ConsoleGateway: Send + Sync {
    fn write(&self, level: ConsoleLevel, message: &str);
    fn clear(&self);
}

/// fetch 请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl FetchRequest {
    /// 创建 GET 请求
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// 创建 POST 请求
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: HashMap::new(),
            body: Some(body.into()),
        }
    }
}

/// fetch 响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// 类 fetch 的请求接口
pub trait NetworkGateway: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> GatewayResult<FetchResponse>;
}

/// 流连接 ID
pub type StreamId = u64;

/// 长连接构造器（WebSocket / EventSource）
pub trait StreamGateway: Send + Sync {
    fn open(&self, url: &str) -> GatewayResult<StreamId>;
}

/// 键值存储（localStorage / sessionStorage）
pub trait StorageGateway: Send + Sync {
    fn get_item(&self, key: &str) -> GatewayResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> GatewayResult<()>;
    fn remove_item(&self, key: &str) -> GatewayResult<()>;
    fn clear(&self) -> GatewayResult<()>;
}

/// DOM 元素引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub tag: String,
    pub id: Option<String>,
}

/// 子树变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomMutation {
    AppendChild { parent: String, html: String },
    RemoveChild { parent: String, child: String },
    SetInnerHtml { target: String, html: String },
}

/// 元素查找与子树变更
pub trait DomGateway: Send + Sync {
    /// 按选择器查找
    fn query(&self, selector: &str) -> Vec<ElementRef>;
    /// 按 id 查找
    fn get_element_by_id(&self, id: &str) -> Option<ElementRef>;
    /// 子树变更
    fn mutate(&self, mutation: DomMutation) -> GatewayResult<()>;
    /// 替换整个页面内容
    fn render(&self, html: &str) -> GatewayResult<()>;
}

/// 剪贴板 API
pub trait ClipboardGateway: Send + Sync {
    fn read_text(&self) -> GatewayResult<String>;
    fn write_text(&self, text: &str) -> GatewayResult<()>;
}

/// 历史记录与地址（history / location）
pub trait NavigationGateway: Send + Sync {
    fn current_url(&self) -> String;
    /// 导航到新地址
    fn navigate(&self, url: &str) -> GatewayResult<()>;
    /// 写入历史记录
    fn push_state(&self, url: &str) -> GatewayResult<()>;
    /// 前进 / 后退
    fn go(&self, delta: i32) -> GatewayResult<()>;
}

/// 性能计时
pub trait PerformanceGateway: Send + Sync {
    /// 相对时间原点的毫秒数
    fn now(&self) -> GatewayResult<f64>;
    fn mark(&self, name: &str) -> GatewayResult<()>;
}

/// 加密能力（getRandomValues / subtle.digest）
pub trait CryptoGateway: Send + Sync {
    fn random_values(&self, buf: &mut [u8]) -> GatewayResult<()>;
    fn digest(&self, data: &[u8]) -> GatewayResult<Vec<u8>>;
}

/// 文件读取
pub trait FileGateway: Send + Sync {
    fn read(&self, name: &str) -> GatewayResult<Vec<u8>>;
}

/// 错误上报目标（onerror / onunhandledrejection）
pub trait ErrorGateway: Send + Sync {
    fn report(&self, message: &str) -> GatewayResult<()>;
}

// ============================================================================
// 只读探测接口（不作为插槽替换）
// ============================================================================

/// 窗口尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl WindowMetrics {
    /// 内外尺寸一致的窗口
    pub fn uniform(width: u32, height: u32) -> Self {
        Self {
            outer_width: width,
            outer_height: height,
            inner_width: width,
            inner_height: height,
        }
    }
}

/// 视口尺寸读取
pub trait ViewportGateway: Send + Sync {
    fn metrics(&self) -> WindowMetrics;
}

/// 开发者工具辅助探测
pub trait DebuggerMonitor: Send + Sync {
    /// getter 陷阱对象是否被读取过（面板打开时控制台会展开对象）
    fn getter_trap_fired(&self) -> bool;
    /// 执行一次断点语句并返回耗时
    fn breakpoint_pause(&self) -> Duration;
}

/// 浏览器环境信息
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigatorInfo {
    pub user_agent: String,
    /// navigator.webdriver
    pub webdriver: bool,
    pub languages: Vec<String>,
    pub plugin_count: u32,
    /// window.chrome 运行时对象是否存在
    pub has_chrome_runtime: bool,
    /// 全局对象上的属性名
    pub global_properties: Vec<String>,
}

/// navigator 读取
pub trait NavigatorGateway: Send + Sync {
    fn info(&self) -> NavigatorInfo;
}
