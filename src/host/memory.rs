//! 内存宿主实现
//!
//! 用于测试和嵌入：每个网关都有一个记录调用的内存实现，
//! [`MemoryHost`] 把它们组装成一个 [`Environment`]，并使用虚拟时间调度。

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use super::gateway::*;
use super::{Environment, HostParts, ManualScheduler};
use crate::clock::{Clock, ManualClock};
use crate::error::GatewayError;
use crate::random::fill_random;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// 定时器（只记录，不执行）
#[derive(Default)]
pub struct MemoryTimers {
    next_id: AtomicU64,
    scheduled: Mutex<Vec<(TimerId, Duration, bool)>>,
}

impl MemoryTimers {
    pub fn scheduled_count(&self) -> usize {
        lock(&self.scheduled).len()
    }
}

impl TimerGateway for MemoryTimers {
    fn schedule(
        &self,
        delay: Duration,
        repeat: bool,
        _callback: TimerCallback,
    ) -> GatewayResult<TimerId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.scheduled).push((id, delay, repeat));
        Ok(id)
    }

    fn clear(&self, id: TimerId) {
        lock(&self.scheduled).retain(|(t, _, _)| *t != id);
    }
}

/// 动态执行（回显源码）
#[derive(Default)]
pub struct MemoryEval {
    evaluated: AtomicUsize,
}

impl MemoryEval {
    pub fn evaluated(&self) -> usize {
        self.evaluated.load(Ordering::SeqCst)
    }
}

impl EvalGateway for MemoryEval {
    fn evaluate(&self, source: &str) -> GatewayResult<String> {
        self.evaluated.fetch_add(1, Ordering::SeqCst);
        Ok(source.to_string())
    }
}

/// 控制台
#[derive(Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<(ConsoleLevel, String)>>,
    clears: AtomicUsize,
}

impl MemoryConsole {
    pub fn lines(&self) -> Vec<(ConsoleLevel, String)> {
        lock(&self.lines).clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl ConsoleGateway for MemoryConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        lock(&self.lines).push((level, message.to_string()));
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        lock(&self.lines).clear();
    }
}

/// 网络请求（固定返回 200）
#[derive(Default)]
pub struct MemoryNetwork {
    requests: Mutex<Vec<FetchRequest>>,
}

impl MemoryNetwork {
    pub fn requests(&self) -> Vec<FetchRequest> {
        lock(&self.requests).clone()
    }
}

impl NetworkGateway for MemoryNetwork {
    fn fetch(&self, request: &FetchRequest) -> GatewayResult<FetchResponse> {
        lock(&self.requests).push(request.clone());
        Ok(FetchResponse {
            status: 200,
            body: "ok".to_string(),
        })
    }
}

/// 长连接
#[derive(Default)]
pub struct MemoryStreams {
    opened: Mutex<Vec<String>>,
}

impl MemoryStreams {
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

impl StreamGateway for MemoryStreams {
    fn open(&self, url: &str) -> GatewayResult<StreamId> {
        let mut opened = lock(&self.opened);
        opened.push(url.to_string());
        Ok(opened.len() as StreamId)
    }
}

/// 键值存储
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageGateway for MemoryStorage {
    fn get_item(&self, key: &str) -> GatewayResult<Option<String>> {
        Ok(self
            .items
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> GatewayResult<()> {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> GatewayResult<()> {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> GatewayResult<()> {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// 文档
#[derive(Default)]
pub struct MemoryDom {
    elements: RwLock<Vec<ElementRef>>,
    mutations: Mutex<Vec<DomMutation>>,
    rendered: Mutex<Option<String>>,
}

impl MemoryDom {
    /// 添加一个可被查询到的元素
    pub fn add_element(&self, tag: &str, id: Option<&str>) {
        self.elements
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(ElementRef {
                tag: tag.to_string(),
                id: id.map(str::to_string),
            });
    }

    pub fn mutations(&self) -> Vec<DomMutation> {
        lock(&self.mutations).clone()
    }

    /// 最近一次整页渲染的内容
    pub fn rendered(&self) -> Option<String> {
        lock(&self.rendered).clone()
    }
}

impl DomGateway for MemoryDom {
    fn query(&self, selector: &str) -> Vec<ElementRef> {
        let elements = self.elements.read().unwrap_or_else(|e| e.into_inner());
        match selector.strip_prefix('#') {
            Some(id) => elements
                .iter()
                .filter(|e| e.id.as_deref() == Some(id))
                .cloned()
                .collect(),
            None => elements
                .iter()
                .filter(|e| selector == "*" || e.tag == selector)
                .cloned()
                .collect(),
        }
    }

    fn get_element_by_id(&self, id: &str) -> Option<ElementRef> {
        self.elements
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
            .cloned()
    }

    fn mutate(&self, mutation: DomMutation) -> GatewayResult<()> {
        lock(&self.mutations).push(mutation);
        Ok(())
    }

    fn render(&self, html: &str) -> GatewayResult<()> {
        *lock(&self.rendered) = Some(html.to_string());
        Ok(())
    }
}

/// 剪贴板
#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<String>,
}

impl ClipboardGateway for MemoryClipboard {
    fn read_text(&self) -> GatewayResult<String> {
        Ok(lock(&self.text).clone())
    }

    fn write_text(&self, text: &str) -> GatewayResult<()> {
        *lock(&self.text) = text.to_string();
        Ok(())
    }
}

/// 导航与历史记录
pub struct MemoryNavigation {
    url: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl Default for MemoryNavigation {
    fn default() -> Self {
        Self::new("https://app.example.com/")
    }
}

impl MemoryNavigation {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            history: Mutex::new(vec![url.clone()]),
            url: Mutex::new(url),
        }
    }

    /// 访问过的地址（包括初始地址）
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }
}

impl NavigationGateway for MemoryNavigation {
    fn current_url(&self) -> String {
        lock(&self.url).clone()
    }

    fn navigate(&self, url: &str) -> GatewayResult<()> {
        *lock(&self.url) = url.to_string();
        lock(&self.history).push(url.to_string());
        Ok(())
    }

    fn push_state(&self, url: &str) -> GatewayResult<()> {
        self.navigate(url)
    }

    fn go(&self, delta: i32) -> GatewayResult<()> {
        let history = lock(&self.history);
        let current = history.len() as i64 - 1;
        let index = current + delta as i64;
        if index < 0 || index > current {
            return Err(GatewayError::Unavailable(format!(
                "history index {} out of range",
                index
            )));
        }
        *lock(&self.url) = history[index as usize].clone();
        Ok(())
    }
}

/// 性能计时（基于时钟）
pub struct MemoryPerformance {
    clock: ManualClock,
    origin: chrono::DateTime<chrono::Utc>,
    marks: Mutex<Vec<String>>,
}

impl MemoryPerformance {
    pub fn new(clock: ManualClock) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            marks: Mutex::new(Vec::new()),
        }
    }

    pub fn marks(&self) -> Vec<String> {
        lock(&self.marks).clone()
    }
}

impl PerformanceGateway for MemoryPerformance {
    fn now(&self) -> GatewayResult<f64> {
        let elapsed = self.clock.now().signed_duration_since(self.origin);
        Ok(elapsed.num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0)
    }

    fn mark(&self, name: &str) -> GatewayResult<()> {
        lock(&self.marks).push(name.to_string());
        Ok(())
    }
}

/// 加密能力（系统随机数 + SHA-256）
#[derive(Default)]
pub struct MemoryCrypto;

impl CryptoGateway for MemoryCrypto {
    fn random_values(&self, buf: &mut [u8]) -> GatewayResult<()> {
        fill_random(buf).map_err(|e| GatewayError::Unavailable(e.to_string()))
    }

    fn digest(&self, data: &[u8]) -> GatewayResult<Vec<u8>> {
        Ok(Sha256::digest(data).to_vec())
    }
}

/// 文件读取
#[derive(Default)]
pub struct MemoryFiles {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFiles {
    pub fn insert(&self, name: &str, content: &[u8]) {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), content.to_vec());
    }
}

impl FileGateway for MemoryFiles {
    fn read(&self, name: &str) -> GatewayResult<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::Unavailable(format!("file not found: {}", name)))
    }
}

/// 错误上报
#[derive(Default)]
pub struct MemoryErrors {
    reports: Mutex<Vec<String>>,
}

impl MemoryErrors {
    pub fn reports(&self) -> Vec<String> {
        lock(&self.reports).clone()
    }
}

impl ErrorGateway for MemoryErrors {
    fn report(&self, message: &str) -> GatewayResult<()> {
        lock(&self.reports).push(message.to_string());
        Ok(())
    }
}

/// 窗口尺寸
pub struct MemoryViewport {
    metrics: Mutex<WindowMetrics>,
    reads: AtomicUsize,
}

impl Default for MemoryViewport {
    fn default() -> Self {
        Self {
            metrics: Mutex::new(WindowMetrics::uniform(1280, 800)),
            reads: AtomicUsize::new(0),
        }
    }
}

impl MemoryViewport {
    pub fn set(&self, metrics: WindowMetrics) {
        *lock(&self.metrics) = metrics;
    }

    /// 被读取的次数
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ViewportGateway for MemoryViewport {
    fn metrics(&self) -> WindowMetrics {
        self.reads.fetch_add(1, Ordering::SeqCst);
        *lock(&self.metrics)
    }
}

/// 调试器探测
#[derive(Default)]
pub struct MemoryDebugger {
    trap_fired: AtomicBool,
    pause: Mutex<Duration>,
}

impl MemoryDebugger {
    pub fn fire_trap(&self) {
        self.trap_fired.store(true, Ordering::SeqCst);
    }

    pub fn set_pause(&self, pause: Duration) {
        *lock(&self.pause) = pause;
    }
}

impl DebuggerMonitor for MemoryDebugger {
    fn getter_trap_fired(&self) -> bool {
        self.trap_fired.load(Ordering::SeqCst)
    }

    fn breakpoint_pause(&self) -> Duration {
        *lock(&self.pause)
    }
}

/// 浏览器环境信息
pub struct MemoryNavigator {
    info: Mutex<NavigatorInfo>,
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self {
            info: Mutex::new(NavigatorInfo {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                    .to_string(),
                webdriver: false,
                languages: vec!["en-US".to_string(), "en".to_string()],
                plugin_count: 3,
                has_chrome_runtime: false,
                global_properties: Vec::new(),
            }),
        }
    }
}

impl MemoryNavigator {
    pub fn set(&self, info: NavigatorInfo) {
        *lock(&self.info) = info;
    }

    pub fn update(&self, f: impl FnOnce(&mut NavigatorInfo)) {
        f(&mut lock(&self.info));
    }
}

impl NavigatorGateway for MemoryNavigator {
    fn info(&self) -> NavigatorInfo {
        lock(&self.info).clone()
    }
}

/// 内存宿主
///
/// 持有每个内存实现的句柄，便于检查调用记录。
pub struct MemoryHost {
    pub timers: Arc<MemoryTimers>,
    pub eval: Arc<MemoryEval>,
    pub console: Arc<MemoryConsole>,
    pub network: Arc<MemoryNetwork>,
    pub websocket: Arc<MemoryStreams>,
    pub event_source: Arc<MemoryStreams>,
    pub local_storage: Arc<MemoryStorage>,
    pub session_storage: Arc<MemoryStorage>,
    pub dom: Arc<MemoryDom>,
    pub clipboard: Arc<MemoryClipboard>,
    pub history: Arc<MemoryNavigation>,
    pub location: Arc<MemoryNavigation>,
    pub performance: Arc<MemoryPerformance>,
    pub crypto: Arc<MemoryCrypto>,
    pub files: Arc<MemoryFiles>,
    pub errors: Arc<MemoryErrors>,
    pub viewport: Arc<MemoryViewport>,
    pub debugger: Arc<MemoryDebugger>,
    pub navigator: Arc<MemoryNavigator>,
    pub scheduler: ManualScheduler,
    pub clock: ManualClock,
    env: Arc<Environment>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let clock = ManualClock::default();
        let scheduler = ManualScheduler::with_clock(clock.clone());

        let timers = Arc::new(MemoryTimers::default());
        let eval = Arc::new(MemoryEval::default());
        let console = Arc::new(MemoryConsole::default());
        let network = Arc::new(MemoryNetwork::default());
        let websocket = Arc::new(MemoryStreams::default());
        let event_source = Arc::new(MemoryStreams::default());
        let local_storage = Arc::new(MemoryStorage::default());
        let session_storage = Arc::new(MemoryStorage::default());
        let dom = Arc::new(MemoryDom::default());
        let clipboard = Arc::new(MemoryClipboard::default());
        let history = Arc::new(MemoryNavigation::default());
        let location = Arc::new(MemoryNavigation::default());
        let performance = Arc::new(MemoryPerformance::new(clock.clone()));
        let crypto = Arc::new(MemoryCrypto);
        let files = Arc::new(MemoryFiles::default());
        let errors = Arc::new(MemoryErrors::default());
        let viewport = Arc::new(MemoryViewport::default());
        let debugger = Arc::new(MemoryDebugger::default());
        let navigator = Arc::new(MemoryNavigator::default());

        let env = Arc::new(Environment::new(HostParts {
            timers: timers.clone(),
            eval: eval.clone(),
            console: console.clone(),
            fetch: network.clone(),
            websocket: websocket.clone(),
            event_source: event_source.clone(),
            local_storage: local_storage.clone(),
            session_storage: session_storage.clone(),
            dom: dom.clone(),
            clipboard: clipboard.clone(),
            history: history.clone(),
            location: location.clone(),
            performance: performance.clone(),
            crypto: crypto.clone(),
            file_access: files.clone(),
            error_reporting: errors.clone(),
            viewport: viewport.clone(),
            debugger: debugger.clone(),
            navigator: navigator.clone(),
            scheduler: Arc::new(scheduler.clone()),
            clock: Arc::new(clock.clone()),
        }));

        Self {
            timers,
            eval,
            console,
            network,
            websocket,
            event_source,
            local_storage,
            session_storage,
            dom,
            clipboard,
            history,
            location,
            performance,
            crypto,
            files,
            errors,
            viewport,
            debugger,
            navigator,
            scheduler,
            clock,
            env,
        }
    }

    /// 组装好的环境
    pub fn env(&self) -> Arc<Environment> {
        Arc::clone(&self.env)
    }

    /// 推进虚拟时间
    pub fn advance(&self, by: Duration) {
        self.scheduler.advance(by);
    }
}
