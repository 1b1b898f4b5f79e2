//! # ShieldRS
//!
//! 客户端防御性插桩层。
//!
//! ## 功能特性
//!
//! - **能力网关**: 定时器、存储、网络、DOM、剪贴板等宿主能力通过可替换的插槽暴露
//! - **守卫模块**: 每个能力域一个守卫，统一的 initialize / destroy 生命周期
//! - **锁定响应**: 检测到违规后替换页面内容并导航到空白页，单向不可撤销
//! - **速率限制**: 滑动窗口限流，按来源限制网络请求
//! - **暴力破解防护**: 按身份计数登录尝试，超出上限后锁定
//! - **CSRF 防护**: 按表单签发 token，提交时精确比对
//! - **密码策略**: 长度、常见密码、重复字符与键盘序列检查
//! - **安全日志**: 有界环形缓冲区，同时转发到 `tracing`
//!
//! ## Features
//!
//! - `tokio-scheduler` - 基于 tokio 的轮询调度器（默认启用）
//!
//! ## 挂载示例
//!
//! ```rust
//! use shieldrs::{MemoryHost, ShieldConfig, ShieldManager};
//! use std::time::Duration;
//!
//! let host = MemoryHost::new();
//! let manager = ShieldManager::new(host.env(), Some(ShieldConfig::default())).unwrap();
//! manager.mount();
//!
//! // 页面脚本访问 localStorage 会触发锁定
//! let _ = host.env().local_storage().get().get_item("session");
//! assert!(manager.lockdown().is_triggered());
//!
//! host.advance(Duration::from_millis(500));
//! manager.unmount();
//! ```
//!
//! ## 速率限制示例
//!
//! ```rust
//! use shieldrs::create_rate_limiter;
//! use std::time::Duration;
//!
//! let mut allow = create_rate_limiter(2, Duration::from_secs(60));
//! assert!(allow("client-1"));
//! assert!(allow("client-1"));
//! assert!(!allow("client-1"));
//! assert!(allow("client-2"));
//! ```
//!
//! ## 密码策略示例
//!
//! ```rust
//! use shieldrs::password::PasswordPolicy;
//!
//! let policy = PasswordPolicy::default();
//! assert!(!policy.is_acceptable("password"));
//! assert!(!policy.is_acceptable("qwerty12"));
//! assert!(policy.is_acceptable("vT7#pL2!mQ9z"));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod guards;
pub mod host;
pub mod lockdown;
pub mod logger;
pub mod manager;
pub mod password;
pub mod random;
pub mod sanitize;
pub mod security;

pub use error::{Error, Result};

// ============================================================================
// 配置与日志导出
// ============================================================================

pub use config::ShieldConfig;
pub use logger::{LogEntry, LogLevel, SecurityLogger};

// ============================================================================
// 管理器与守卫导出
// ============================================================================

pub use guards::{Guard, GuardContext, GuardState, GuardStatus};
pub use lockdown::Lockdown;
pub use manager::{ShieldManager, ShieldManagerBuilder};

// ============================================================================
// 宿主环境导出
// ============================================================================

pub use host::{Capability, Environment, HostEvent, MemoryHost};

// ============================================================================
// 密码相关导出
// ============================================================================

pub use password::{PasswordPolicy, hash_password, verify_password};

// ============================================================================
// 随机数生成函数导出
// ============================================================================

pub use random::{
    constant_time_compare, constant_time_compare_str, generate_csrf_token,
    generate_random_alphanumeric, generate_random_base64_url, generate_random_bytes,
    generate_random_hex, generate_secure_token,
};

// ============================================================================
// 安全防护相关导出
// ============================================================================

pub use security::{
    AccountLockoutConfig, CsrfConfig, CsrfProtection, CsrfToken, LoginAttemptTracker,
    RateLimitConfig, RateLimitInfo, RateLimiter, create_rate_limiter,
};
