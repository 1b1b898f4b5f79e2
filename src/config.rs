//! 防护配置模块
//!
//! [`ShieldConfig`] 是一个扁平的值对象：每个子行为一个布尔开关，外加若干数值阈值。
//! 所有开关默认开启；构造完成后以 `Arc` 在各守卫模块间共享，不再修改。
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::config::ShieldConfig;
//! use std::time::Duration;
//!
//! let config = ShieldConfig::default()
//!     .with_max_login_attempts(3)
//!     .with_lockout_duration(Duration::from_secs(600));
//! assert!(config.validate().is_ok());
//!
//! let parsed = ShieldConfig::from_json(r#"{ "block_console": false }"#).unwrap();
//! assert!(!parsed.block_console);
//! assert!(parsed.block_fetch);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// 默认拦截的快捷键
pub const DEFAULT_BLOCKED_SHORTCUTS: &[&str] = &[
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "Ctrl+A", "Ctrl+C",
    "Ctrl+P", "Ctrl+S", "Ctrl+U", "Ctrl+Shift+I", "Ctrl+Shift+J", "Ctrl+Shift+C", "Alt+Left",
    "Alt+Right",
];

/// 防护配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    // ------------------------------------------------------------------------
    // 定时器 / 动态执行
    // ------------------------------------------------------------------------
    /// 替换宿主定时器
    pub block_timers: bool,
    /// 替换动态代码执行入口
    pub block_eval: bool,

    // ------------------------------------------------------------------------
    // 开发者工具检测
    // ------------------------------------------------------------------------
    /// 基于窗口尺寸差的轮询检测
    pub detect_devtools: bool,
    /// getter 陷阱探测
    pub devtools_getter_trap: bool,
    /// 断点耗时差探测
    pub devtools_debugger_timing: bool,
    /// 轮询间隔
    #[serde(with = "duration_ms")]
    pub devtools_detection_interval: Duration,
    /// 尺寸差阈值（像素，严格大于才判定）
    pub devtools_threshold: u32,
    /// 断点耗时阈值
    #[serde(with = "duration_ms")]
    pub debugger_timing_threshold: Duration,

    // ------------------------------------------------------------------------
    // 控制台
    // ------------------------------------------------------------------------
    /// 静默控制台
    pub block_console: bool,
    /// 定期清空控制台
    pub clear_console: bool,
    /// 清空间隔
    #[serde(with = "duration_ms")]
    pub console_clear_interval: Duration,

    // ------------------------------------------------------------------------
    // 网络
    // ------------------------------------------------------------------------
    pub block_fetch: bool,
    pub block_websocket: bool,
    pub block_event_source: bool,
    /// 未拦截 fetch 时按来源限流
    pub network_rate_limit: bool,

    // ------------------------------------------------------------------------
    // 存储 / DOM / 剪贴板
    // ------------------------------------------------------------------------
    pub block_local_storage: bool,
    pub block_session_storage: bool,
    pub block_dom_access: bool,
    pub block_clipboard_events: bool,
    pub block_clipboard_api: bool,

    // ------------------------------------------------------------------------
    // 输入事件
    // ------------------------------------------------------------------------
    pub block_context_menu: bool,
    pub block_non_primary_buttons: bool,
    pub block_shortcuts: bool,
    pub block_touch_gestures: bool,
    pub block_drag_drop: bool,
    pub block_text_selection: bool,
    /// 输入拦截时是否同时触发锁定
    pub input_lockdown_on_violation: bool,
    /// 拦截的快捷键，例如 `Ctrl+Shift+I`
    pub blocked_shortcuts: Vec<String>,
    /// 不受输入拦截影响的管理操作元素 id
    pub admin_action_ids: Vec<String>,

    // ------------------------------------------------------------------------
    // 表单策略
    // ------------------------------------------------------------------------
    pub enforce_password_policy: bool,
    pub password_min_length: usize,
    /// `Input` 事件在未达到最小长度时也检查（逐字输入即可触发锁定）
    pub password_check_partial_input: bool,
    pub brute_force_protection: bool,
    pub max_login_attempts: u32,
    /// 登录尝试计数窗口
    #[serde(with = "duration_ms")]
    pub login_attempt_window: Duration,
    #[serde(with = "duration_ms")]
    pub lockout_duration: Duration,
    pub csrf_protection: bool,
    #[serde(with = "duration_ms")]
    pub csrf_token_ttl: Duration,
    pub detect_injection: bool,

    // ------------------------------------------------------------------------
    // 机器人检测
    // ------------------------------------------------------------------------
    /// 交互量不足判定
    pub detect_bots: bool,
    pub check_user_agent: bool,
    pub check_automation: bool,
    #[serde(with = "duration_ms")]
    pub bot_observation_delay: Duration,
    pub bot_min_mouse_events: u32,
    pub bot_min_key_events: u32,
    /// 突发事件合并窗口
    #[serde(with = "duration_ms")]
    pub bot_event_coalesce: Duration,
    /// 额外的 User-Agent 黑名单子串
    pub extra_blocked_user_agents: Vec<String>,

    // ------------------------------------------------------------------------
    // 其他能力域
    // ------------------------------------------------------------------------
    pub block_view_source: bool,
    pub block_history: bool,
    pub block_location: bool,
    pub block_navigation_events: bool,
    pub intercept_errors: bool,
    pub block_performance: bool,
    pub block_crypto: bool,
    pub block_file_access: bool,

    // ------------------------------------------------------------------------
    // 速率限制 / 日志
    // ------------------------------------------------------------------------
    pub rate_limit_max_requests: u32,
    #[serde(with = "duration_ms")]
    pub rate_limit_window: Duration,
    pub log_capacity: usize,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            block_timers: true,
            block_eval: true,
            detect_devtools: true,
            devtools_getter_trap: true,
            devtools_debugger_timing: true,
            devtools_detection_interval: Duration::from_millis(100),
            devtools_threshold: 160,
            debugger_timing_threshold: Duration::from_millis(100),
            block_console: true,
            clear_console: true,
            console_clear_interval: Duration::from_millis(50),
            block_fetch: true,
            block_websocket: true,
            block_event_source: true,
            network_rate_limit: true,
            block_local_storage: true,
            block_session_storage: true,
            block_dom_access: true,
            block_clipboard_events: true,
            block_clipboard_api: true,
            block_context_menu: true,
            block_non_primary_buttons: true,
            block_shortcuts: true,
            block_touch_gestures: true,
            block_drag_drop: true,
            block_text_selection: true,
            input_lockdown_on_violation: true,
            blocked_shortcuts: DEFAULT_BLOCKED_SHORTCUTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            admin_action_ids: Vec::new(),
            enforce_password_policy: true,
            password_min_length: 8,
            password_check_partial_input: false,
            brute_force_protection: true,
            max_login_attempts: 5,
            login_attempt_window: Duration::from_secs(5 * 60),
            lockout_duration: Duration::from_secs(15 * 60),
            csrf_protection: true,
            csrf_token_ttl: Duration::from_secs(3600),
            detect_injection: true,
            detect_bots: true,
            check_user_agent: true,
            check_automation: true,
            bot_observation_delay: Duration::from_secs(10),
            bot_min_mouse_events: 5,
            bot_min_key_events: 3,
            bot_event_coalesce: Duration::from_millis(100),
            extra_blocked_user_agents: Vec::new(),
            block_view_source: true,
            block_history: true,
            block_location: true,
            block_navigation_events: true,
            intercept_errors: true,
            block_performance: true,
            block_crypto: true,
            block_file_access: true,
            rate_limit_max_requests: 10,
            rate_limit_window: Duration::from_secs(60),
            log_capacity: 1000,
        }
    }
}

impl ShieldConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 严格配置：更少的登录次数、更长的锁定
    pub fn strict() -> Self {
        Self {
            max_login_attempts: 3,
            lockout_duration: Duration::from_secs(30 * 60),
            password_min_length: 12,
            rate_limit_max_requests: 5,
            ..Self::default()
        }
    }

    /// 宽松配置（适用于开发环境）
    ///
    /// 只保留表单策略相关的模块，不替换任何宿主能力。
    pub fn relaxed() -> Self {
        Self {
            max_login_attempts: 10,
            lockout_duration: Duration::from_secs(5 * 60),
            password_min_length: 6,
            rate_limit_max_requests: 100,
            ..Self::all_disabled()
        }
        .with_form_policies(true)
    }

    /// 所有开关关闭，阈值保持默认
    pub fn all_disabled() -> Self {
        Self {
            block_timers: false,
            block_eval: false,
            detect_devtools: false,
            devtools_getter_trap: false,
            devtools_debugger_timing: false,
            block_console: false,
            clear_console: false,
            block_fetch: false,
            block_websocket: false,
            block_event_source: false,
            network_rate_limit: false,
            block_local_storage: false,
            block_session_storage: false,
            block_dom_access: false,
            block_clipboard_events: false,
            block_clipboard_api: false,
            block_context_menu: false,
            block_non_primary_buttons: false,
            block_shortcuts: false,
            block_touch_gestures: false,
            block_drag_drop: false,
            block_text_selection: false,
            input_lockdown_on_violation: false,
            enforce_password_policy: false,
            brute_force_protection: false,
            csrf_protection: false,
            detect_injection: false,
            detect_bots: false,
            check_user_agent: false,
            check_automation: false,
            block_view_source: false,
            block_history: false,
            block_location: false,
            block_navigation_events: false,
            intercept_errors: false,
            block_performance: false,
            block_crypto: false,
            block_file_access: false,
            ..Self::default()
        }
    }

    /// 从 JSON 加载配置，缺省字段使用默认值
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 同时设置密码策略、暴力破解、CSRF 与注入检测开关
    pub fn with_form_policies(mut self, enabled: bool) -> Self {
        self.enforce_password_policy = enabled;
        self.brute_force_protection = enabled;
        self.csrf_protection = enabled;
        self.detect_injection = enabled;
        self
    }

    /// 设置最大登录尝试次数
    pub fn with_max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    /// 设置锁定时长
    pub fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = duration;
        self
    }

    /// 设置密码最小长度
    pub fn with_password_min_length(mut self, length: usize) -> Self {
        self.password_min_length = length;
        self
    }

    /// 设置速率限制
    pub fn with_rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.rate_limit_max_requests = max_requests;
        self.rate_limit_window = window;
        self
    }

    /// 设置开发者工具检测间隔
    pub fn with_devtools_detection_interval(mut self, interval: Duration) -> Self {
        self.devtools_detection_interval = interval;
        self
    }

    /// 设置控制台清空间隔
    pub fn with_console_clear_interval(mut self, interval: Duration) -> Self {
        self.console_clear_interval = interval;
        self
    }

    /// 设置日志容量
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// 添加管理操作元素 id
    pub fn with_admin_action_id(mut self, id: impl Into<String>) -> Self {
        self.admin_action_ids.push(id.into());
        self
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("devtools_detection_interval", self.devtools_detection_interval),
            ("console_clear_interval", self.console_clear_interval),
            ("login_attempt_window", self.login_attempt_window),
            ("lockout_duration", self.lockout_duration),
            ("rate_limit_window", self.rate_limit_window),
            ("csrf_token_ttl", self.csrf_token_ttl),
        ];
        for (key, value) in intervals {
            if value.is_zero() {
                return Err(Error::invalid_config(key, "must be greater than 0"));
            }
        }

        if self.max_login_attempts == 0 {
            return Err(Error::invalid_config(
                "max_login_attempts",
                "must be greater than 0",
            ));
        }
        if self.rate_limit_max_requests == 0 {
            return Err(Error::invalid_config(
                "rate_limit_max_requests",
                "must be greater than 0",
            ));
        }
        if self.password_min_length == 0 {
            return Err(Error::invalid_config(
                "password_min_length",
                "must be greater than 0",
            ));
        }
        if self.log_capacity == 0 {
            return Err(Error::invalid_config("log_capacity", "must be greater than 0"));
        }
        Ok(())
    }
}

/// 以毫秒整数序列化 Duration
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
