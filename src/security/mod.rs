//! 安全防护模块
//!
//! 守卫模块共享的有状态服务。
//!
//! ## 子模块
//!
//! - **rate_limit**: 滑动窗口速率限制
//! - **account**: 登录尝试追踪与账户锁定
//! - **csrf**: CSRF (跨站请求伪造) token 签发与校验
//!
//! ## 速率限制示例
//!
//! ```rust
//! use shieldrs::security::rate_limit::{RateLimiter, RateLimitConfig};
//! use std::time::Duration;
//!
//! let config = RateLimitConfig::new()
//!     .with_max_requests(5)
//!     .with_window(Duration::from_secs(60));
//! let limiter = RateLimiter::new(config);
//!
//! let key = "https://api.example.com";
//! match limiter.check(key) {
//!     Ok(info) => println!("allowed, remaining: {}", info.remaining),
//!     Err(_) => println!("rate limited"),
//! }
//! ```

pub mod account;
pub mod csrf;
pub mod rate_limit;

pub use account::{
    AccountLockoutConfig, LockReason, LockStatus, LoginAttemptTracker, LoginCheckResult,
    TrackerStats,
};
pub use csrf::{CsrfConfig, CsrfProtection, CsrfToken, validate_csrf_token};
pub use rate_limit::{
    RateLimitConfig, RateLimitInfo, RateLimiter, create_rate_limiter,
    create_rate_limiter_with_clock,
};
